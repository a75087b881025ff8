use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "djitxt")]
#[command(about = "DJI flight log (TXT) decoding toolkit")]
#[command(version)]
pub struct Cli {
    /// Control colored output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Increase diagnostic logging on stderr (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Decode worker threads (0 = one per core, 1 = decode on the main thread)
    #[arg(long, default_value = "0", global = true)]
    pub threads: usize,

    /// Memory-map the input file instead of reading it into memory
    #[arg(long, global = true)]
    pub mmap: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show header layout, record statistics and type distribution
    Info {
        /// Path to flight log (.txt)
        #[arg(short, long)]
        file: String,

        /// Show the file header section
        #[arg(long)]
        header: bool,

        /// Show record counts
        #[arg(long)]
        records: bool,

        /// Show the record type distribution
        #[arg(long)]
        distribution: bool,

        /// Show a hex dump of the details area
        #[arg(long)]
        details: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Decode all records and print them as JSON
    Parse {
        /// Path to flight log (.txt)
        #[arg(short, long)]
        file: String,

        /// Only emit records of this type (name such as OSD, or numeric code)
        #[arg(short = 't', long = "type")]
        record_type: Option<String>,

        /// Group records into telemetry rows, one per OSD record
        #[arg(long)]
        rows: bool,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,

        /// Read payloads as stored (skip descrambling)
        #[arg(long)]
        raw: bool,
    },

    /// Show every record of a single type
    Show {
        /// Path to flight log (.txt)
        #[arg(short, long)]
        file: String,

        /// Record type (name such as GIMBAL, or numeric code)
        #[arg(short = 't', long = "type")]
        record_type: String,

        /// Include a hex dump of each canonical payload
        #[arg(long)]
        hex: bool,

        /// Read payloads as stored (skip descrambling)
        #[arg(long)]
        raw: bool,
    },

    /// Write a copy of the log with every payload descrambled
    Unscramble {
        /// Path to flight log (.txt)
        #[arg(short, long)]
        file: String,

        /// Directory for the output file (default: next to the input)
        #[arg(short = 'd', long = "dir")]
        out_dir: Option<String>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}
