/// Capture collaborators for a sweep
///
/// A sweep asks its capture source for one grayscale frame per
/// micro-adjustment value. The source owns everything about how the frame is
/// produced: reading a saved file, waiting for the user to turn the dial, or
/// generating a synthetic image in tests.
use crate::errors::CaptureError;
use crate::types::GrayFrame;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Produces the frame taken at a given micro-adjustment.
pub trait CaptureSource {
    fn capture(&mut self, adjustment: i32) -> Result<GrayFrame, CaptureError>;
}

impl<F> CaptureSource for F
where
    F: FnMut(i32) -> Result<GrayFrame, CaptureError>,
{
    fn capture(&mut self, adjustment: i32) -> Result<GrayFrame, CaptureError> {
        self(adjustment)
    }
}

/// Replays a sweep from images saved on disk.
///
/// Files follow the `AFtest_iter_{run}_adj_{value}.jpg` naming used when the
/// sweep was recorded.
#[derive(Debug, Clone)]
pub struct DirectoryReplay {
    pub directory: PathBuf,
    pub run: u32,
}

impl DirectoryReplay {
    pub fn new(directory: impl Into<PathBuf>, run: u32) -> Self {
        Self {
            directory: directory.into(),
            run,
        }
    }

    pub fn file_name(run: u32, adjustment: i32) -> String {
        format!("AFtest_iter_{}_adj_{}.jpg", run, adjustment)
    }

    pub fn path_for(&self, adjustment: i32) -> PathBuf {
        self.directory.join(Self::file_name(self.run, adjustment))
    }
}

impl CaptureSource for DirectoryReplay {
    fn capture(&mut self, adjustment: i32) -> Result<GrayFrame, CaptureError> {
        let path = self.path_for(adjustment);
        load_gray(&path)
    }
}

/// Decode an image file and convert it to luma.
///
/// The format is sniffed from the file contents, falling back to the
/// extension.
pub fn load_gray(path: &Path) -> Result<GrayFrame, CaptureError> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(CaptureError::not_found(&display));
    }

    let image = image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(CaptureError::io)?
        .decode()
        .map_err(|e| CaptureError::decode(&display, e))?;
    log::debug!(
        "Loaded {} ({}x{})",
        display,
        image.width(),
        image.height()
    );
    Ok(GrayFrame::from_dynamic(&image))
}

/// Asks the operator to set each adjustment on the camera before capturing.
///
/// In batch mode the prompt is skipped and the inner source is called
/// directly.
pub struct ManualPrompt<S> {
    inner: S,
    batch: bool,
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl<S: CaptureSource> ManualPrompt<S> {
    /// Prompt on stdout and wait for return on stdin.
    pub fn new(inner: S, batch: bool) -> Self {
        Self::with_io(
            inner,
            batch,
            Box::new(io::BufReader::new(io::stdin())),
            Box::new(io::stdout()),
        )
    }

    pub fn with_io(inner: S, batch: bool, input: Box<dyn BufRead>, output: Box<dyn Write>) -> Self {
        Self {
            inner,
            batch,
            input,
            output,
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    fn prompt(&mut self, adjustment: i32) -> Result<(), CaptureError> {
        writeln!(
            self.output,
            "Please change the microadjustment level to {} and press return when ready",
            adjustment
        )
        .and_then(|_| self.output.flush())
        .map_err(CaptureError::io)?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(CaptureError::io)?;
        if read == 0 {
            return Err(CaptureError::cancelled());
        }
        Ok(())
    }
}

impl<S: CaptureSource> CaptureSource for ManualPrompt<S> {
    fn capture(&mut self, adjustment: i32) -> Result<GrayFrame, CaptureError> {
        if !self.batch {
            self.prompt(adjustment)?;
        }
        self.inner.capture(adjustment)
    }
}

/// Stops a sweep once `flag` is raised, e.g. from a Ctrl-C handler.
pub struct Cancellable<S> {
    inner: S,
    flag: Arc<AtomicBool>,
}

impl<S: CaptureSource> Cancellable<S> {
    pub fn new(inner: S, flag: Arc<AtomicBool>) -> Self {
        Self { inner, flag }
    }
}

impl<S: CaptureSource> CaptureSource for Cancellable<S> {
    fn capture(&mut self, adjustment: i32) -> Result<GrayFrame, CaptureError> {
        if self.flag.load(Ordering::SeqCst) {
            log::warn!("Sweep cancelled before adjustment {}", adjustment);
            return Err(CaptureError::cancelled());
        }
        self.inner.capture(adjustment)
    }
}
