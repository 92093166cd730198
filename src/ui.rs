// UI layer: asks for the pictures directory with `dialoguer`, then walks
// the listing and uploads one picture at a time, printing each response.

use crate::api::Predict;
use crate::config::Config;
use crate::pictures::{list_pictures, read_picture};
use anyhow::{Context, Result};
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const PROMPT: &str = "Introdu cale poze";

/// Run the whole flow: prompt for a directory, then upload its files.
/// Blocks until the last picture has been answered or a fault aborts it.
pub fn run<P: Predict>(api: &P, config: &Config) -> Result<()> {
    let (dir, pictures) =
        collect_pictures(ask_directory, config.max_attempts, config.images_only)?;
    info!("Found {} file(s) in {}", pictures.len(), dir.display());
    println!();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let sent = upload_all(api, &pictures, &mut out)?;
    info!("Uploaded {} picture(s)", sent);
    Ok(())
}

/// One prompt for the directory. On a terminal this goes through
/// `dialoguer`; when stdin is piped the prompt is printed on stdout and a
/// plain line is read instead. Empty input is allowed and simply fails the
/// directory check afterwards.
pub fn ask_directory() -> Result<String> {
    if !io::stdin().is_terminal() {
        return read_directory_line(&mut io::stdin().lock(), &mut io::stdout());
    }
    let path: String = Input::new()
        .with_prompt(PROMPT)
        .allow_empty(true)
        .interact_text()?;
    Ok(path)
}

/// Write the prompt to `out` and read one line from `input`.
/// End of input is an error, so the caller stops asking.
pub fn read_directory_line<R, W>(input: &mut R, out: &mut W) -> Result<String>
where
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    writeln!(out, "{}:", PROMPT).context("Failed to write prompt")?;
    out.flush().context("Failed to flush prompt")?;

    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .context("Failed to read directory path from stdin")?;
    if read == 0 {
        anyhow::bail!("Standard input closed before a directory path was given");
    }
    Ok(line.trim().to_string())
}

/// Keep asking `read_path` for a directory until its listing succeeds.
///
/// Listing failures are swallowed (only logged) and trigger another
/// prompt. After `max_attempts` rejected paths this gives up with an
/// error. A failure of `read_path` itself (closed terminal) is returned
/// immediately.
pub fn collect_pictures<F>(
    mut read_path: F,
    max_attempts: u32,
    images_only: bool,
) -> Result<(PathBuf, Vec<PathBuf>)>
where
    F: FnMut() -> Result<String>,
{
    for attempt in 1..=max_attempts {
        let raw = read_path().context("Failed to read directory path")?;
        let dir = PathBuf::from(raw.trim());
        match list_pictures(&dir, images_only) {
            Ok(pictures) => return Ok((dir, pictures)),
            Err(e) => warn!(
                "Attempt {}/{}: cannot list {}: {}",
                attempt,
                max_attempts,
                dir.display(),
                e
            ),
        }
    }
    anyhow::bail!("No readable directory given after {} attempt(s)", max_attempts)
}

/// Upload every picture in order and write one response line per file to
/// `out`. Stops at the first failure; later files are not attempted.
/// Returns how many pictures were answered.
pub fn upload_all<P, W>(api: &P, pictures: &[PathBuf], out: &mut W) -> Result<usize>
where
    P: Predict + ?Sized,
    W: Write,
{
    let style = ProgressStyle::with_template("{spinner} {msg}")
        .context("Invalid spinner template")?;

    for (done, path) in pictures.iter().enumerate() {
        let bytes = read_picture(path)?;
        info!("Uploading {} ({} bytes)", path.display(), bytes.len());

        // The spinner draws on stderr and is hidden when that is not a tty.
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style.clone());
        spinner.set_message(format!("Uploading {}...", display_name(path)));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let result = api.predict(bytes);
        spinner.finish_and_clear();

        let text = result
            .with_context(|| format!("Upload of {} failed after {} done", path.display(), done))?;
        writeln!(out, "{}", text).context("Failed to write prediction")?;
    }
    out.flush().context("Failed to flush output")?;
    Ok(pictures.len())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    /// Records every body it receives; fails on the call index in `fail_at`.
    struct RecordingPredictor {
        bodies: RefCell<Vec<Vec<u8>>>,
        fail_at: Option<usize>,
    }

    impl RecordingPredictor {
        fn new(fail_at: Option<usize>) -> Self {
            RecordingPredictor {
                bodies: RefCell::new(Vec::new()),
                fail_at,
            }
        }
    }

    impl Predict for RecordingPredictor {
        fn predict(&self, picture: Vec<u8>) -> Result<String> {
            let index = self.bodies.borrow().len();
            self.bodies.borrow_mut().push(picture.clone());
            if self.fail_at == Some(index) {
                anyhow::bail!("endpoint down");
            }
            Ok(format!("prediction for {}", String::from_utf8_lossy(&picture)))
        }
    }

    fn write_files(dir: &Path, files: &[(&str, &str)]) -> Vec<PathBuf> {
        files
            .iter()
            .map(|(name, data)| {
                let path = dir.join(name);
                fs::write(&path, data).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn uploads_each_file_once_in_order() {
        let dir = tempdir().unwrap();
        let paths = write_files(
            dir.path(),
            &[("1.jpg", "one"), ("2.jpg", "two"), ("3.jpg", "three")],
        );
        let api = RecordingPredictor::new(None);
        let mut out = Vec::new();

        let sent = upload_all(&api, &paths, &mut out).unwrap();

        assert_eq!(sent, 3);
        assert_eq!(
            *api.bodies.borrow(),
            vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]
        );
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "prediction for one\nprediction for two\nprediction for three\n"
        );
    }

    #[test]
    fn empty_file_is_sent_with_empty_body() {
        let dir = tempdir().unwrap();
        let paths = write_files(dir.path(), &[("empty.png", ""), ("next.png", "x")]);
        let api = RecordingPredictor::new(None);
        let mut out = Vec::new();

        upload_all(&api, &paths, &mut out).unwrap();

        let bodies = api.bodies.borrow();
        assert_eq!(bodies.len(), 2);
        assert!(bodies[0].is_empty());
    }

    #[test]
    fn failure_stops_the_batch() {
        let dir = tempdir().unwrap();
        let paths = write_files(dir.path(), &[("a", "a"), ("b", "b"), ("c", "c")]);
        let api = RecordingPredictor::new(Some(1));
        let mut out = Vec::new();

        let err = upload_all(&api, &paths, &mut out).unwrap_err();

        assert_eq!(api.bodies.borrow().len(), 2);
        assert_eq!(String::from_utf8(out).unwrap(), "prediction for a\n");
        assert!(format!("{:#}", err).contains("endpoint down"));
    }

    #[test]
    fn unreadable_file_stops_the_batch_before_upload() {
        let dir = tempdir().unwrap();
        let mut paths = write_files(dir.path(), &[("a", "a")]);
        paths.push(dir.path().join("vanished"));
        paths.extend(write_files(dir.path(), &[("c", "c")]));
        let api = RecordingPredictor::new(None);
        let mut out = Vec::new();

        assert!(upload_all(&api, &paths, &mut out).is_err());
        assert_eq!(api.bodies.borrow().len(), 1);
    }

    #[test]
    fn reprompts_until_a_directory_lists() {
        let dir = tempdir().unwrap();
        write_files(dir.path(), &[("cat.jpg", "c")]);
        let answers = vec![
            String::new(),
            "/definitely/not/here".to_string(),
            dir.path().join("cat.jpg").display().to_string(),
            format!("  {}  ", dir.path().display()),
        ];
        let mut answers = answers.into_iter();
        let mut asked = 0;

        let (found, pictures) = collect_pictures(
            || {
                asked += 1;
                Ok(answers.next().unwrap())
            },
            10,
            false,
        )
        .unwrap();

        assert_eq!(asked, 4);
        assert_eq!(found, dir.path());
        assert_eq!(pictures, vec![dir.path().join("cat.jpg")]);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut asked = 0;
        let err = collect_pictures(
            || {
                asked += 1;
                Ok("/no/such/dir".to_string())
            },
            3,
            false,
        )
        .unwrap_err();

        assert_eq!(asked, 3);
        assert!(err.to_string().contains("3 attempt"));
    }

    #[test]
    fn input_failure_is_not_retried() {
        let mut asked = 0;
        let result = collect_pictures(
            || {
                asked += 1;
                Err(anyhow::anyhow!("terminal closed"))
            },
            5,
            false,
        );
        assert!(result.is_err());
        assert_eq!(asked, 1);
    }

    #[test]
    fn reads_trimmed_line_then_fails_at_end_of_input() {
        let mut input = io::Cursor::new("  /some/pictures dir \n");
        let mut prompts = Vec::new();

        let first = read_directory_line(&mut input, &mut prompts).unwrap();
        assert_eq!(first, "/some/pictures dir");

        let err = read_directory_line(&mut input, &mut prompts).unwrap_err();
        assert!(err.to_string().contains("closed"));
        assert_eq!(
            String::from_utf8(prompts).unwrap(),
            "Introdu cale poze:\nIntrodu cale poze:\n"
        );
    }

    #[test]
    fn piped_directory_is_accepted() {
        let dir = tempdir().unwrap();
        write_files(dir.path(), &[("a.jpg", "a")]);
        let mut input = io::Cursor::new(format!("{}\n", dir.path().display()));
        let mut prompts = Vec::new();

        let (found, pictures) = collect_pictures(
            || read_directory_line(&mut input, &mut prompts),
            10,
            false,
        )
        .unwrap();

        assert_eq!(found, dir.path());
        assert_eq!(pictures, vec![dir.path().join("a.jpg")]);
    }

    #[test]
    fn end_of_piped_input_is_not_retried() {
        let mut input = io::Cursor::new("/no/such/dir\n");
        let mut prompts = Vec::new();

        let err = collect_pictures(
            || read_directory_line(&mut input, &mut prompts),
            10,
            false,
        )
        .unwrap_err();

        // One rejected path, then end of input stops the loop.
        let asked = String::from_utf8(prompts).unwrap().matches(PROMPT).count();
        assert_eq!(asked, 2);
        assert!(format!("{:#}", err).contains("closed"));
    }

    #[test]
    fn images_only_applies_to_collected_listing() {
        let dir = tempdir().unwrap();
        write_files(dir.path(), &[("cat.jpg", "c"), ("notes.txt", "n")]);
        let path = dir.path().display().to_string();

        let (_, pictures) = collect_pictures(|| Ok(path.clone()), 1, true).unwrap();
        assert_eq!(pictures, vec![dir.path().join("cat.jpg")]);
    }
}
