use std::path::PathBuf;

use cast_timeline::PlaybackSpeed;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "cast-player",
    about = "Replay an asciicast recording together with the agent's thinking markers"
)]
pub struct Cli {
    /// Path to the `.cast` recording.
    pub file: PathBuf,

    /// Playback speed multiplier (0.5, 1, 2 or 4).
    #[arg(long)]
    pub speed: Option<PlaybackSpeed>,

    /// Start playback at this offset in seconds.
    #[arg(long, default_value_t = 0.0)]
    pub from: f64,

    /// Do not print agent thoughts while replaying.
    #[arg(long)]
    pub no_thoughts: bool,

    /// Print the recording outline (duration, markers) instead of replaying it.
    #[arg(long)]
    pub summary: bool,

    /// Log at debug level (overrides CAST_TIMELINE_LOG).
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use cast_timeline::PlaybackSpeed;
    use clap::Parser;

    #[test]
    fn parses_speed_and_offsets() {
        let cli = Cli::try_parse_from(["cast-player", "run.cast", "--speed", "2x", "--from", "1.5"])
            .expect("arguments should parse");
        assert_eq!(cli.speed, Some(PlaybackSpeed::Double));
        assert_eq!(cli.from, 1.5);
        assert!(!cli.summary);
    }

    #[test]
    fn rejects_unsupported_speed() {
        assert!(Cli::try_parse_from(["cast-player", "run.cast", "--speed", "3"]).is_err());
    }

    #[test]
    fn file_is_required() {
        assert!(Cli::try_parse_from(["cast-player"]).is_err());
    }
}
