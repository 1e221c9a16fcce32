//! Style accumulator - persona learned from one trusted sender.
//!
//! Collects the privileged sender's own messages into a bounded corpus and
//! renders them into a system instruction. Text from anyone else never enters
//! the corpus; command-like input is excluded too.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::ConfigError;
use crate::memory::RingBuffer;

/// Command prefix; text starting with it never becomes a style sample.
pub const COMMAND_PREFIX: char = '/';

/// Persona instruction used while the corpus is still empty.
const NEUTRAL_PERSONA: &str = "Answer briefly and to the point.";

/// Per-sender style corpora with an optional seed file.
pub struct StyleAccumulator {
    privileged: Vec<String>,
    corpora: Mutex<HashMap<String, RingBuffer<String>>>,
    capacity: usize,
    corpus_path: Option<PathBuf>,
}

impl StyleAccumulator {
    /// Create an accumulator for the given privileged sender IDs.
    pub fn new(
        privileged: Vec<String>,
        capacity: usize,
        corpus_path: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        // Validate once so lazy corpus creation cannot fail.
        RingBuffer::<String>::new(capacity)?;
        Ok(Self {
            privileged,
            corpora: Mutex::new(HashMap::new()),
            capacity,
            corpus_path,
        })
    }

    /// Whether `identity` feeds a style corpus.
    pub fn is_privileged(&self, identity: &str) -> bool {
        self.privileged.iter().any(|id| id == identity)
    }

    /// The identity whose corpus renders the persona prefix.
    ///
    /// With several privileged senders configured the first one is the
    /// persona source; the rest still accumulate their own corpora.
    pub fn primary(&self) -> Option<&str> {
        self.privileged.first().map(String::as_str)
    }

    /// Record a style sample if the sender qualifies.
    ///
    /// Silently ignores non-privileged senders, empty text and commands.
    pub fn record(&self, identity: &str, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.starts_with(COMMAND_PREFIX) {
            return;
        }
        if !self.is_privileged(identity) {
            return;
        }

        let mut corpora = self.corpora.lock();
        let corpus = self.entry(&mut corpora, identity);
        corpus.push(trimmed.to_string());
        debug!(identity, samples = corpus.len(), "Recorded style sample");
    }

    /// Render the persona system instruction for `identity`.
    ///
    /// Samples appear oldest to newest. The instruction tells the backend to
    /// imitate the samples and not to talk about doing so; that clause is a
    /// prompt-construction policy, not an enforced guarantee.
    pub fn render_prefix(&self, identity: &str) -> String {
        let samples = {
            let corpora = self.corpora.lock();
            corpora.get(identity).map(|c| c.snapshot()).unwrap_or_default()
        };

        if samples.is_empty() {
            return NEUTRAL_PERSONA.to_string();
        }

        let mut prefix = String::from(
            "Write your replies in the voice of the following message samples. \
             Match their tone, phrasing, typical length and quirks. \
             Never mention the samples or that you are imitating anyone's style.\n\nSamples:\n",
        );
        for sample in &samples {
            prefix.push_str("- ");
            prefix.push_str(sample);
            prefix.push('\n');
        }
        prefix
    }

    /// Clear one identity's corpus; other corpora are untouched.
    pub fn reset(&self, identity: &str) {
        let mut corpora = self.corpora.lock();
        if let Some(corpus) = corpora.get_mut(identity) {
            corpus.clear();
        }
    }

    /// Number of samples currently held for `identity`.
    pub fn sample_count(&self, identity: &str) -> usize {
        let corpora = self.corpora.lock();
        corpora.get(identity).map(|c| c.len()).unwrap_or(0)
    }

    /// Re-read the seed corpus file into every privileged corpus.
    ///
    /// Each non-empty, non-command line is one sample. A missing or
    /// unreadable file means an empty seed, never a crash. Returns the number
    /// of samples loaded.
    pub fn reload_from_file(&self) -> usize {
        let Some(path) = self.corpus_path.as_deref() else {
            return 0;
        };
        let lines = read_corpus_lines(path);

        let mut corpora = self.corpora.lock();
        for identity in &self.privileged {
            let corpus = self.entry(&mut corpora, identity);
            corpus.clear();
            for line in &lines {
                corpus.push(line.clone());
            }
        }
        debug!(path = %path.display(), samples = lines.len(), "Reloaded style corpus");
        lines.len()
    }

    fn entry<'a>(
        &self,
        corpora: &'a mut HashMap<String, RingBuffer<String>>,
        identity: &str,
    ) -> &'a mut RingBuffer<String> {
        corpora.entry(identity.to_string()).or_insert_with(|| {
            // Capacity was validated in the constructor.
            RingBuffer::new(self.capacity).unwrap_or_else(|_| unreachable!())
        })
    }
}

fn read_corpus_lines(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with(COMMAND_PREFIX))
            .map(String::from)
            .collect(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Style corpus unreadable, using empty corpus");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn accumulator() -> StyleAccumulator {
        StyleAccumulator::new(vec!["42".to_string()], 10, None).unwrap()
    }

    #[test]
    fn test_privileged_sample_recorded() {
        let style = accumulator();
        style.record("42", "well, actually");
        assert_eq!(style.sample_count("42"), 1);
    }

    #[test]
    fn test_non_privileged_sender_ignored() {
        let style = accumulator();
        style.record("99", "ignore me");
        assert_eq!(style.sample_count("99"), 0);
        assert!(!style.render_prefix("42").contains("ignore me"));
    }

    #[test]
    fn test_commands_and_empty_text_excluded() {
        let style = accumulator();
        style.record("42", "/reset");
        style.record("42", "   ");
        assert_eq!(style.sample_count("42"), 0);
    }

    #[test]
    fn test_empty_corpus_renders_neutral_persona() {
        let style = accumulator();
        let prefix = style.render_prefix("42");
        assert_eq!(prefix, NEUTRAL_PERSONA);
    }

    #[test]
    fn test_prefix_embeds_samples_in_order() {
        let style = accumulator();
        style.record("42", "first sample");
        style.record("42", "second sample");

        let prefix = style.render_prefix("42");
        let first = prefix.find("first sample").unwrap();
        let second = prefix.find("second sample").unwrap();
        assert!(first < second);
        assert!(prefix.contains("Never mention the samples"));
    }

    #[test]
    fn test_corpus_bounded() {
        let style = StyleAccumulator::new(vec!["42".to_string()], 3, None).unwrap();
        for i in 0..5 {
            style.record("42", &format!("sample {}", i));
        }
        assert_eq!(style.sample_count("42"), 3);
        let prefix = style.render_prefix("42");
        assert!(!prefix.contains("sample 0"));
        assert!(prefix.contains("sample 4"));
    }

    #[test]
    fn test_reset_affects_only_one_identity() {
        let style =
            StyleAccumulator::new(vec!["42".to_string(), "43".to_string()], 10, None).unwrap();
        style.record("42", "from 42");
        style.record("43", "from 43");

        style.reset("42");
        assert_eq!(style.sample_count("42"), 0);
        assert_eq!(style.sample_count("43"), 1);
    }

    #[test]
    fn test_primary_is_first_configured() {
        let style =
            StyleAccumulator::new(vec!["42".to_string(), "43".to_string()], 10, None).unwrap();
        assert_eq!(style.primary(), Some("42"));
        assert_eq!(accumulator().primary(), Some("42"));
    }

    #[test]
    fn test_reload_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "seed one").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "/not a sample").unwrap();
        writeln!(file, "seed two").unwrap();

        let style = StyleAccumulator::new(
            vec!["42".to_string()],
            10,
            Some(file.path().to_path_buf()),
        )
        .unwrap();

        assert_eq!(style.reload_from_file(), 2);
        let prefix = style.render_prefix("42");
        assert!(prefix.contains("seed one"));
        assert!(prefix.contains("seed two"));
        assert!(!prefix.contains("not a sample"));
    }

    #[test]
    fn test_reload_missing_file_is_empty_corpus() {
        let style = StyleAccumulator::new(
            vec!["42".to_string()],
            10,
            Some(PathBuf::from("/nonexistent/style.txt")),
        )
        .unwrap();

        assert_eq!(style.reload_from_file(), 0);
        assert_eq!(style.render_prefix("42"), NEUTRAL_PERSONA);
    }

    #[test]
    fn test_reload_replaces_accumulated_samples() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "from file").unwrap();

        let style = StyleAccumulator::new(
            vec!["42".to_string()],
            10,
            Some(file.path().to_path_buf()),
        )
        .unwrap();
        style.record("42", "live sample");

        style.reload_from_file();
        let prefix = style.render_prefix("42");
        assert!(prefix.contains("from file"));
        assert!(!prefix.contains("live sample"));
    }
}
