//! Audiobook to podcast conversion.
//!
//! Wires the stages together: list → analyse → plan → merge/compress →
//! publish → feed. The CLI and the integration tests both enter here.

use crate::audio::{
    Analyzer, BookTags, DurationProbe, SilenceDetector, list_audio_files, read_tags,
};
use crate::book::{BookMeta, BookOverrides};
use crate::config::Config;
use crate::error::{BookcastError, Result};
use crate::exec::CommandExecutor;
use crate::feed::{FeedFiles, write_feeds};
use crate::pipeline::{Pipeline, Publisher, RunEvent, RunReport};
use crate::planner::{AudioFile, EpisodePlan, SegmentPlanner};
use crossbeam_channel::Sender;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// One conversion job.
#[derive(Debug, Clone, Default)]
pub struct ConvertRequest {
    /// Directory holding the book's audio files.
    pub src: PathBuf,
    /// Directory the book's own directory is created in.
    pub dst: PathBuf,
    pub overrides: BookOverrides,
}

/// Outcome of a run that got as far as publishing.
#[derive(Debug)]
pub struct Conversion {
    pub book: BookMeta,
    pub output_dir: PathBuf,
    pub report: RunReport,
    pub feeds: FeedFiles,
}

/// Episode plans computed without touching any audio data.
#[derive(Debug)]
pub struct BookPlan {
    pub book: BookMeta,
    pub episodes: Vec<EpisodePlan>,
}

/// Converts the book in `request.src` into episodes and feeds under
/// `request.dst/<id>/`.
///
/// Returns an error when nothing can be planned, or when an episode fails
/// under the `fail-fast` policy. Under `skip-episode` the failures are in
/// the report and the feed lists the episodes that made it.
pub fn convert(
    config: &Config,
    request: &ConvertRequest,
    executor: Arc<dyn CommandExecutor>,
    events: Option<Sender<RunEvent>>,
) -> Result<Conversion> {
    config.validate()?;
    let (files, book) = prepare(config, &request.src, &request.overrides, executor.as_ref())?;
    let book = Arc::new(book);

    let publisher = Publisher::new(&request.dst, book.clone())?;
    info!(
        book = %book.id,
        title = %book.title,
        files = files.len(),
        output = %publisher.dir().display(),
        "converting"
    );

    let analysis = analyzer(config, executor.clone())
        .analyze_ordered(files, config.analysis_workers());
    let plans = SegmentPlanner::new(analysis, config.planner_config());

    let mut pipeline = Pipeline::new(config.pipeline_config(), executor, book.clone());
    if let Some(tx) = events {
        pipeline = pipeline.with_event_sender(tx);
    }
    let report = pipeline.run(plans, &publisher)?;

    let now = chrono::Local::now().fixed_offset();
    let feeds = write_feeds(
        publisher.dir(),
        &book,
        &report.published,
        &config.feed_options(),
        now,
    )?;

    Ok(Conversion {
        book: book.as_ref().clone(),
        output_dir: publisher.dir().to_path_buf(),
        report,
        feeds,
    })
}

/// Plans the episodes of the book in `src` without producing any audio.
pub fn plan(
    config: &Config,
    src: &Path,
    overrides: &BookOverrides,
    executor: Arc<dyn CommandExecutor>,
) -> Result<BookPlan> {
    config.validate()?;
    let (files, book) = prepare(config, src, overrides, executor.as_ref())?;

    let analysis = analyzer(config, executor).analyze_ordered(files, config.analysis_workers());
    let episodes = SegmentPlanner::new(analysis, config.planner_config())
        .collect::<Result<Vec<_>>>()?;

    info!(book = %book.id, episodes = episodes.len(), "planned");
    Ok(BookPlan { book, episodes })
}

/// Lists the source files and resolves the book metadata.
fn prepare(
    config: &Config,
    src: &Path,
    overrides: &BookOverrides,
    executor: &dyn CommandExecutor,
) -> Result<(Vec<AudioFile>, BookMeta)> {
    let files: Vec<AudioFile> = list_audio_files(src, config.extension())?.collect();
    let Some(first) = files.first() else {
        return Err(BookcastError::NoAudioFiles {
            root: src.display().to_string(),
            extension: config.extension().to_string(),
        });
    };

    let tags = match read_tags(executor, &config.tools.ffmpeg, first.path()) {
        Ok(tags) => tags,
        Err(e) => {
            warn!(file = %first.path().display(), error = %e, "could not read tags");
            BookTags::default()
        }
    };
    let book = BookMeta::resolve(src, overrides.clone(), tags);
    Ok((files, book))
}

fn analyzer(config: &Config, executor: Arc<dyn CommandExecutor>) -> Arc<Analyzer> {
    let probe = DurationProbe::new(executor.clone(), config.tools.ffprobe.clone());
    let analyzer = Analyzer::new(probe);
    let analyzer = match config.silence_config() {
        Some(silence) => analyzer.with_silence(SilenceDetector::new(
            executor,
            config.tools.ffmpeg.clone(),
            silence,
        )),
        None => analyzer,
    };
    Arc::new(analyzer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::CommandOutput;
    use crate::exec::mock::MockCommandExecutor;
    use crate::pipeline::FailurePolicy;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Fake ffmpeg/ffprobe: every file lasts `secs`, outputs get written.
    fn executor(secs: u64) -> Arc<MockCommandExecutor> {
        Arc::new(MockCommandExecutor::new().with_handler(move |command, args| {
            match command {
                "ffprobe" => Ok(CommandOutput::stdout(format!("format,{secs}.000000\n"))),
                _ if args.contains(&"ffmetadata") => Ok(CommandOutput::stdout(
                    ";FFMETADATA1\nalbum=Dune\nartist=Frank Herbert\n",
                )),
                _ if args.contains(&"null") => Ok(CommandOutput::stderr("")),
                _ => {
                    if let Some(out) = args.last() {
                        fs::write(out, b"mp3").map_err(BookcastError::Io)?;
                    }
                    Ok(CommandOutput::default())
                }
            }
        }))
    }

    fn book_dir(files: usize) -> TempDir {
        let dir = tempfile::Builder::new().prefix("Dune").tempdir().unwrap();
        for i in 1..=files {
            fs::write(dir.path().join(format!("{i:02}.mp3")), b"").unwrap();
        }
        dir
    }

    #[test]
    fn test_plan_uses_tags_and_episode_length() {
        let src = book_dir(3);
        let config = Config::default();

        let plan = plan(&config, src.path(), &BookOverrides::default(), executor(400)).unwrap();

        assert_eq!(plan.book.title, "Dune");
        assert_eq!(plan.book.author, "Frank Herbert");
        // 1200s of audio in 600s episodes
        assert_eq!(plan.episodes.len(), 2);
        assert_eq!(plan.episodes[0].total(), Duration::from_secs(600));
        assert_eq!(plan.episodes[1].position, 2);
    }

    #[test]
    fn test_plan_overrides_win_over_tags() {
        let src = book_dir(1);
        let overrides = BookOverrides {
            id: Some("Children of Dune".to_string()),
            title: Some("Children".to_string()),
            author: None,
        };

        let plan = plan(&Config::default(), src.path(), &overrides, executor(60)).unwrap();

        assert_eq!(plan.book.id, "children-of-dune");
        assert_eq!(plan.book.title, "Children");
        assert_eq!(plan.book.author, "Frank Herbert");
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let src = book_dir(0);
        let result = plan(&Config::default(), src.path(), &BookOverrides::default(), executor(1));
        assert!(matches!(result, Err(BookcastError::NoAudioFiles { .. })));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_any_tool_runs() {
        let src = book_dir(1);
        let mut config = Config::default();
        config.episodes.length_secs = 0;
        let exec = executor(1);

        let result = plan(&config, src.path(), &BookOverrides::default(), exec.clone());

        assert!(matches!(result, Err(BookcastError::ConfigInvalidValue { .. })));
        assert_eq!(exec.call_count(), 0);
    }

    #[test]
    fn test_unreadable_tags_fall_back_to_placeholders() {
        let src = book_dir(1);
        let exec = Arc::new(MockCommandExecutor::new().with_handler(|command, args| {
            if command == "ffprobe" {
                Ok(CommandOutput::stdout("format,30.0\n"))
            } else if args.contains(&"ffmetadata") {
                Err(BookcastError::ToolFailed {
                    command: "ffmpeg".to_string(),
                    output: "broken".to_string(),
                })
            } else {
                Ok(CommandOutput::default())
            }
        }));

        let plan = plan(&Config::default(), src.path(), &BookOverrides::default(), exec).unwrap();

        assert_eq!(plan.book.title, crate::defaults::BOOK_TITLE);
        assert_eq!(plan.episodes.len(), 1);
    }

    #[test]
    fn test_convert_publishes_episodes_and_feeds() {
        let src = book_dir(2);
        let dst = TempDir::new().unwrap();
        let mut config = Config::default();
        config.pipeline.workers = Some(2);
        config.pipeline.on_error = FailurePolicy::SkipEpisode;
        let request = ConvertRequest {
            src: src.path().to_path_buf(),
            dst: dst.path().to_path_buf(),
            overrides: BookOverrides {
                id: Some("dune".to_string()),
                ..BookOverrides::default()
            },
        };

        let conversion = convert(&config, &request, executor(450), None).unwrap();

        assert_eq!(conversion.output_dir, dst.path().join("dune"));
        assert!(conversion.report.is_success());
        let positions: Vec<usize> = conversion
            .report
            .published
            .iter()
            .map(|e| e.position)
            .collect();
        assert_eq!(positions, vec![1, 2]);
        assert!(conversion.output_dir.join("dune-0001.mp3").exists());
        assert!(conversion.output_dir.join("dune-0002.mp3").exists());

        let rss = fs::read_to_string(&conversion.feeds.rss).unwrap();
        assert_eq!(rss.matches("<item>").count(), 2);
        let m3u = fs::read_to_string(&conversion.feeds.m3u).unwrap();
        assert_eq!(m3u, "#EXTM3U\n\ndune-0001.mp3\ndune-0002.mp3\n");
    }
}
