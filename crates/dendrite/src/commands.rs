use clap::Parser;
use clap::Subcommand;

#[derive(Parser)]
#[command(
    name = "dendrite",
    about = "Orchestrates neuron-simulation processes and relays live results",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the daemon in the foreground
    Daemon,

    /// Launch a simulation for a client
    Launch {
        /// Client identifier owning the simulation
        client_id: String,
        /// Simulation config: inline JSON, or @path to read a file
        config: String,
    },

    /// Poll a simulation's status by pid
    Status { pid: u32 },

    /// Terminate a simulation by pid
    Terminate { pid: u32 },

    /// List registered simulations
    Sims,

    /// Publish a payload to a data channel (the internal push endpoint)
    Push {
        data_channel_id: String,
        /// Payload: inline JSON, or @path to read a file
        payload: String,
    },

    /// Send an interactive command to a running simulation
    Command {
        pid: u32,
        /// Command name, e.g. "pause"
        name: String,
        /// Parameter mapping as inline JSON (defaults to {})
        #[arg(default_value = "{}")]
        params: String,
    },

    /// Fetch an output artifact from a client's session directory
    FetchArtifact {
        client_id: String,
        filename: String,
        /// Write the decoded bytes here instead of stdout
        #[arg(short, long)]
        output: Option<std::path::PathBuf>,
    },

    /// Join a data channel and print relayed payloads as they arrive
    Watch {
        data_channel_id: String,
        /// Also register this client id on the connection, so the
        /// daemon cleans up its session and process when watch exits
        #[arg(long)]
        register: Option<String>,
    },
}
