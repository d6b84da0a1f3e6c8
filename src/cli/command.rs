/// Programmatic form of the CLI subcommands.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Produce `count` records into a capped collection in the background and tail them.
    Demo {
        collection: String,
        count: usize,
        interval_ms: u64,
        filter_json: Option<String>,
    },
    /// Send `count` log lines through the capped log handler and tail the log collection.
    Logs {
        service: String,
        count: usize,
    },
    Slug {
        text: String,
    },
    /// Effective configuration and the collections in the store.
    Info,
}
