//! End-to-end runs against scripted ffmpeg/ffprobe stand-ins.

use bookcast::exec::{CommandExecutor, CommandOutput};
use bookcast::pipeline::{FailurePolicy, PipelineMode};
use bookcast::{BookOverrides, BookcastError, Config, ConvertRequest, convert, plan};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Duration reported for files the script knows nothing about (encoded episodes).
const ENCODED_SECS: f64 = 600.0;

/// Answers the handful of tool invocations a conversion makes.
#[derive(Default)]
struct ScriptedTools {
    durations: HashMap<String, f64>,
    silence_logs: HashMap<String, String>,
    fail_track: Option<usize>,
    /// Delay encodes so that later episodes finish first.
    stagger: bool,
    encoded: Mutex<Vec<usize>>,
}

impl ScriptedTools {
    fn with_file(mut self, name: &str, secs: f64) -> Self {
        self.durations.insert(name.to_string(), secs);
        self
    }

    fn with_silence_log(mut self, name: &str, log: &str) -> Self {
        self.silence_logs.insert(name.to_string(), log.to_string());
        self
    }

    fn failing_track(mut self, position: usize) -> Self {
        self.fail_track = Some(position);
        self
    }

    fn staggered(mut self) -> Self {
        self.stagger = true;
        self
    }

    fn encode_order(&self) -> Vec<usize> {
        self.encoded.lock().unwrap().clone()
    }
}

impl CommandExecutor for ScriptedTools {
    fn execute(&self, command: &str, args: &[&str]) -> bookcast::Result<CommandOutput> {
        let input = args
            .windows(2)
            .find(|pair| pair[0] == "-i")
            .map(|pair| pair[1])
            .unwrap_or("");
        let name = Path::new(input)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if command == "ffprobe" {
            let secs = self.durations.get(&name).copied().unwrap_or(ENCODED_SECS);
            return Ok(CommandOutput::stdout(format!("format,{secs:.6}\n")));
        }
        if args.contains(&"ffmetadata") {
            return Ok(CommandOutput::stdout(
                ";FFMETADATA1\nalbum=The Test Book\nartist=Jane Roe\n",
            ));
        }
        if args.contains(&"null") {
            let log = self.silence_logs.get(&name).cloned().unwrap_or_default();
            return Ok(CommandOutput::stderr(log));
        }

        if let Some(track) = args.iter().find_map(|a| a.strip_prefix("track=")) {
            let position: usize = track.parse().unwrap();
            if self.fail_track == Some(position) {
                return Err(BookcastError::ToolFailed {
                    command: format!("{command} {}", args.join(" ")),
                    output: "Error while encoding".to_string(),
                });
            }
            if self.stagger {
                thread::sleep(Duration::from_millis(20 * (6 - position.min(5)) as u64));
            }
            self.encoded.lock().unwrap().push(position);
        }

        if let Some(out) = args.last() {
            fs::write(out, format!("{command} output")).map_err(BookcastError::Io)?;
        }
        Ok(CommandOutput::default())
    }
}

fn book_dir(files: &[&str]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for name in files {
        fs::write(dir.path().join(name), b"").unwrap();
    }
    dir
}

fn overrides() -> BookOverrides {
    BookOverrides {
        id: Some("test-book".to_string()),
        ..BookOverrides::default()
    }
}

fn request(src: &TempDir, dst: &TempDir) -> ConvertRequest {
    ConvertRequest {
        src: src.path().to_path_buf(),
        dst: dst.path().to_path_buf(),
        overrides: overrides(),
    }
}

fn config(scratch: &TempDir) -> Config {
    let mut config = Config::default();
    config.pipeline.temp_dir = Some(scratch.path().to_path_buf());
    config.pipeline.workers = Some(3);
    config
}

fn secs(s: f64) -> Duration {
    Duration::from_secs_f64(s)
}

#[test]
fn carries_debt_across_files() {
    let src = book_dir(&["01.mp3", "02.mp3"]);
    let tools = Arc::new(
        ScriptedTools::default()
            .with_file("01.mp3", 720.0)
            .with_file("02.mp3", 540.0),
    );

    let book_plan = plan(&Config::default(), src.path(), &overrides(), tools).unwrap();

    let episodes = &book_plan.episodes;
    assert_eq!(episodes.len(), 3);

    assert_eq!(episodes[0].ranges.len(), 1);
    assert_eq!(episodes[0].ranges[0].to, secs(600.0));

    let second = &episodes[1];
    assert_eq!(second.ranges.len(), 2);
    assert!(second.ranges[0].source.path().ends_with("01.mp3"));
    assert_eq!((second.ranges[0].from, second.ranges[0].to), (secs(600.0), secs(720.0)));
    assert!(second.ranges[1].source.path().ends_with("02.mp3"));
    assert_eq!((second.ranges[1].from, second.ranges[1].to), (secs(0.0), secs(480.0)));
    assert_eq!(second.total(), secs(600.0));

    assert_eq!(episodes[2].total(), secs(60.0));
    assert_eq!(book_plan.book.title, "The Test Book");
    assert_eq!(book_plan.book.author, "Jane Roe");
}

#[test]
fn snaps_cut_to_nearby_silence() {
    let src = book_dir(&["01.mp3"]);
    let tools = Arc::new(
        ScriptedTools::default()
            .with_file("01.mp3", 900.0)
            .with_silence_log(
                "01.mp3",
                "[silencedetect @ 0x1] silence_start: 598\n\
                 [silencedetect @ 0x1] silence_end: 599 | silence_duration: 1\n",
            ),
    );
    let mut config = Config::default();
    config.silence.enabled = true;

    let book_plan = plan(&config, src.path(), &overrides(), tools).unwrap();

    assert_eq!(book_plan.episodes[0].total(), secs(598.5));
    assert_eq!(book_plan.episodes[1].ranges[0].from, secs(598.5));
    assert_eq!(book_plan.episodes[1].ranges[0].to, secs(900.0));
}

#[test]
fn pool_publishes_in_position_order() {
    let names = ["01.mp3", "02.mp3", "03.mp3", "04.mp3", "05.mp3"];
    let src = book_dir(&names);
    let dst = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let tools = names
        .iter()
        .fold(ScriptedTools::default(), |tools, name| tools.with_file(name, 600.0))
        .staggered();
    let tools = Arc::new(tools);
    let mut config = config(&scratch);
    config.pipeline.mode = PipelineMode::Pool;

    let conversion = convert(&config, &request(&src, &dst), tools.clone(), None).unwrap();

    let positions: Vec<usize> = conversion
        .report
        .published
        .iter()
        .map(|e| e.position)
        .collect();
    assert_eq!(positions, vec![1, 2, 3, 4, 5]);
    // The workers really did finish out of order.
    assert_ne!(tools.encode_order(), vec![1, 2, 3, 4, 5]);

    let m3u = fs::read_to_string(&conversion.feeds.m3u).unwrap();
    let listed: Vec<&str> = m3u.lines().skip(2).collect();
    assert_eq!(
        listed,
        vec![
            "test-book-0001.mp3",
            "test-book-0002.mp3",
            "test-book-0003.mp3",
            "test-book-0004.mp3",
            "test-book-0005.mp3",
        ]
    );

    let rss = fs::read_to_string(&conversion.feeds.rss).unwrap();
    let first = rss.find("test-book-0001.mp3").unwrap();
    let last = rss.find("test-book-0005.mp3").unwrap();
    assert!(first < last);

    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[test]
fn staged_run_writes_episodes_and_feeds() {
    let src = book_dir(&["01.mp3", "02.mp3"]);
    let dst = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let tools = Arc::new(
        ScriptedTools::default()
            .with_file("01.mp3", 720.0)
            .with_file("02.mp3", 540.0),
    );

    let conversion = convert(&config(&scratch), &request(&src, &dst), tools, None).unwrap();

    let book_dir = dst.path().join("test-book");
    assert_eq!(conversion.output_dir, book_dir);
    assert!(conversion.report.is_success());
    assert_eq!(conversion.report.published.len(), 3);
    for position in 1..=3 {
        assert!(book_dir.join(format!("test-book-{position:04}.mp3")).exists());
    }
    assert!(book_dir.join("test-book.xml").exists());
    assert!(book_dir.join("test-book.m3u").exists());
    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[test]
fn fail_fast_aborts_without_feed() {
    let src = book_dir(&["01.mp3", "02.mp3", "03.mp3"]);
    let tools = Arc::new(
        ScriptedTools::default()
            .with_file("01.mp3", 600.0)
            .with_file("02.mp3", 600.0)
            .with_file("03.mp3", 600.0)
            .failing_track(2),
    );

    for mode in [PipelineMode::Staged, PipelineMode::Pool] {
        let dst = TempDir::new().unwrap();
        let scratch = TempDir::new().unwrap();
        let mut config = config(&scratch);
        config.pipeline.mode = mode;

        let result = convert(&config, &request(&src, &dst), tools.clone(), None);

        match result {
            Err(BookcastError::EpisodeFailed { position, message }) => {
                assert_eq!(position, 2, "{mode:?}");
                assert!(message.contains("Error while encoding"));
            }
            other => panic!("Expected EpisodeFailed, got {:?}", other),
        }
        let book_dir = dst.path().join("test-book");
        let left: Vec<_> = fs::read_dir(&book_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert!(left.is_empty(), "{mode:?} left {left:?}");
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}

#[test]
fn skip_episode_publishes_the_rest() {
    let src = book_dir(&["01.mp3", "02.mp3", "03.mp3"]);
    let dst = TempDir::new().unwrap();
    let scratch = TempDir::new().unwrap();
    let tools = Arc::new(
        ScriptedTools::default()
            .with_file("01.mp3", 600.0)
            .with_file("02.mp3", 600.0)
            .with_file("03.mp3", 600.0)
            .failing_track(2),
    );

    for mode in [PipelineMode::Staged, PipelineMode::Pool] {
        let mut config = config(&scratch);
        config.pipeline.mode = mode;
        config.pipeline.on_error = FailurePolicy::SkipEpisode;

        let conversion = convert(&config, &request(&src, &dst), tools.clone(), None).unwrap();

        assert_eq!(conversion.report.failed_positions(), vec![2], "{mode:?}");
        let positions: Vec<usize> = conversion
            .report
            .published
            .iter()
            .map(|e| e.position)
            .collect();
        assert_eq!(positions, vec![1, 3], "{mode:?}");

        let m3u = fs::read_to_string(&conversion.feeds.m3u).unwrap();
        assert!(!m3u.contains("test-book-0002.mp3"));
        assert!(!conversion.output_dir.join("test-book-0002.mp3").exists());
    }
    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[test]
fn empty_source_directory_is_reported() {
    let src = book_dir(&["cover.jpg"]);
    let dst = TempDir::new().unwrap();
    let tools = Arc::new(ScriptedTools::default());

    let result = convert(&Config::default(), &request(&src, &dst), tools, None);

    assert!(matches!(result, Err(BookcastError::NoAudioFiles { .. })));
}
