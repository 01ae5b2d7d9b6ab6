//! Crontab entries that run `sentinel run` a few times a day.
//!
//! Every line Sentinel owns ends with `# job-hunter-sentinel`; install and
//! uninstall only ever touch lines carrying that marker.

pub mod crontab;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::errors::SentinelError;

pub const MARKER: &str = "job-hunter-sentinel";

/// Daily run times installed when `--times` is not given.
pub const DEFAULT_TIMES: [RunTime; 3] = [
    RunTime { hour: 8, minute: 0 },
    RunTime { hour: 12, minute: 0 },
    RunTime { hour: 18, minute: 0 },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunTime {
    pub hour: u8,
    pub minute: u8,
}

impl fmt::Display for RunTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for RunTime {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SentinelError::Config(format!("Invalid run time '{s}' (expected HH:MM)"));
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u8 = hour.trim().parse().map_err(|_| invalid())?;
        let minute: u8 = minute.trim().parse().map_err(|_| invalid())?;
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }
        Ok(RunTime { hour, minute })
    }
}

/// Parses `08:00,12:30`. Duplicates are dropped; order is kept.
pub fn parse_times(raw: &str) -> Result<Vec<RunTime>, SentinelError> {
    let mut times: Vec<RunTime> = Vec::new();
    for part in raw.split(',').filter(|p| !p.trim().is_empty()) {
        let time: RunTime = part.parse()?;
        if !times.contains(&time) {
            times.push(time);
        }
    }
    if times.is_empty() {
        return Err(SentinelError::Config("No run times given".into()));
    }
    Ok(times)
}

/// Quotes a path for the shell. Cron turns a bare `%` into a newline even
/// inside quotes, so it is escaped as `\%`.
fn shell_quote(path: &Path) -> String {
    let s = path.display().to_string();
    let plain = s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "/._-+:@".contains(c));
    if plain && !s.is_empty() {
        s
    } else {
        format!("'{}'", s.replace('\'', r"'\''").replace('%', r"\%"))
    }
}

/// One crontab line per run time:
/// `M H * * * cd <workdir> && <exe> run >> <log> 2>&1 # job-hunter-sentinel`
pub fn build_entries(times: &[RunTime], workdir: &Path, exe: &Path, log: &Path) -> Vec<String> {
    let command = format!(
        "cd {} && {} run >> {} 2>&1",
        shell_quote(workdir),
        shell_quote(exe),
        shell_quote(log)
    );
    times
        .iter()
        .map(|t| format!("{} {} * * * {command} # {MARKER}", t.minute, t.hour))
        .collect()
}

pub fn is_marked(line: &str) -> bool {
    line.contains(MARKER)
}

/// Lines of `contents` carrying the marker.
pub fn marked_lines(contents: &str) -> Vec<&str> {
    contents.lines().filter(|l| is_marked(l)).collect()
}

/// Removes every marker line. All other lines, including their line
/// endings, come back unchanged. Returns the new contents and the count removed.
pub fn strip_marked(contents: &str) -> (String, usize) {
    let mut kept = String::with_capacity(contents.len());
    let mut removed = 0;
    for line in contents.split_inclusive('\n') {
        if is_marked(line) {
            removed += 1;
        } else {
            kept.push_str(line);
        }
    }
    (kept, removed)
}

/// `contents` without any previous Sentinel lines, followed by `entries`.
pub fn with_entries(contents: &str, entries: &[String]) -> (String, usize) {
    let (mut updated, replaced) = strip_marked(contents);
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    for entry in entries {
        updated.push_str(entry);
        updated.push('\n');
    }
    (updated, replaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn entries() -> Vec<String> {
        build_entries(
            &DEFAULT_TIMES,
            Path::new("/home/me/sentinel"),
            Path::new("/usr/local/bin/sentinel"),
            Path::new("/home/me/sentinel/logs/cron.log"),
        )
    }

    #[test]
    fn test_build_entries_format() {
        let entries = entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[0],
            "0 8 * * * cd /home/me/sentinel && /usr/local/bin/sentinel run >> /home/me/sentinel/logs/cron.log 2>&1 # job-hunter-sentinel"
        );
        assert!(entries[2].starts_with("0 18 * * * "));
    }

    #[test]
    fn test_paths_with_spaces_are_quoted() {
        let entries = build_entries(
            &[RunTime { hour: 7, minute: 30 }],
            &PathBuf::from("/home/me/My Jobs"),
            Path::new("/bin/sentinel"),
            Path::new("/tmp/log"),
        );
        assert!(entries[0].starts_with("30 7 * * * cd '/home/me/My Jobs' && /bin/sentinel run"));
    }

    #[test]
    fn test_percent_signs_are_escaped_for_cron() {
        let entries = build_entries(
            &[RunTime { hour: 7, minute: 30 }],
            Path::new("/srv/100%jobs"),
            Path::new("/bin/sentinel"),
            Path::new("/tmp/%d.log"),
        );
        assert_eq!(
            entries[0],
            r"30 7 * * * cd '/srv/100\%jobs' && /bin/sentinel run >> '/tmp/\%d.log' 2>&1 # job-hunter-sentinel"
        );
    }

    #[test]
    fn test_parse_times() {
        let times = parse_times("08:00, 12:30,08:00").unwrap();
        assert_eq!(
            times,
            vec![RunTime { hour: 8, minute: 0 }, RunTime { hour: 12, minute: 30 }]
        );
        assert_eq!(times[1].to_string(), "12:30");
        assert!(parse_times("24:00").is_err());
        assert!(parse_times("8").is_err());
        assert!(parse_times(" , ").is_err());
    }

    #[test]
    fn test_install_twice_does_not_duplicate() {
        let original = "MAILTO=me@x.com\n15 3 * * * /usr/bin/backup\n";
        let (once, replaced_first) = with_entries(original, &entries());
        let (twice, replaced_second) = with_entries(&once, &entries());

        assert_eq!(replaced_first, 0);
        assert_eq!(replaced_second, 3);
        assert_eq!(once, twice);
        assert_eq!(marked_lines(&twice).len(), 3);
        assert!(twice.starts_with(original));
    }

    #[test]
    fn test_strip_marked_leaves_other_lines_byte_for_byte() {
        let contents = "# my jobs\r\n0 8 * * * old run # job-hunter-sentinel\n  */5 * * * * ping  \n0 12 * * * x # job-hunter-sentinel\nlast line no newline";
        let (stripped, removed) = strip_marked(contents);
        assert_eq!(removed, 2);
        assert_eq!(stripped, "# my jobs\r\n  */5 * * * * ping  \nlast line no newline");
    }

    #[test]
    fn test_with_entries_adds_newline_to_unterminated_crontab() {
        let (updated, _) = with_entries("0 1 * * * a", &["x # job-hunter-sentinel".to_string()]);
        assert_eq!(updated, "0 1 * * * a\nx # job-hunter-sentinel\n");
    }
}
