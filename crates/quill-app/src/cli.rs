use std::path::PathBuf;

use clap::Parser;

use quill_config::TransportKind;

/// Quill: chat with the blog's assistant from the terminal.
#[derive(Parser, Debug)]
#[command(name = "quill", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log filter override (e.g. "debug" or "quill=trace").
    #[arg(long)]
    pub log_level: Option<String>,

    /// Answer delivery: single-shot, chunked-stream or persistent-channel.
    #[arg(short = 't', long)]
    pub transport: Option<TransportKind>,

    /// Answer service base URL.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Ask one question, print the answer and exit.
    #[arg(short = 'q', long)]
    pub ask: Option<String>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    pub print_config: bool,
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        let args = Args::parse_from([
            "quill",
            "--transport",
            "persistent",
            "--base-url",
            "https://blog.example",
            "-q",
            "What is X?",
        ]);
        assert_eq!(args.transport, Some(TransportKind::PersistentChannel));
        assert_eq!(args.base_url.as_deref(), Some("https://blog.example"));
        assert_eq!(args.ask.as_deref(), Some("What is X?"));
        assert!(!args.print_config);
    }

    #[test]
    fn rejects_unknown_transport() {
        assert!(Args::try_parse_from(["quill", "--transport", "carrier-pigeon"]).is_err());
    }
}
