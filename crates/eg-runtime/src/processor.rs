use eg_core::window::Window;

/// Consumer of windows: a summariser, an exporter, a test recorder.
///
/// `process` is called once per window (or split part) in order. Returning
/// [`ProcessError::TooLarge`] asks the driver to split the window and retry
/// with the parts; any other error stops the run.
pub trait WindowProcessor {
    fn process(&mut self, window: &Window<'_>) -> Result<(), ProcessError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The window exceeds what the processor can handle in one go.
    #[error("window too large: estimated {estimated}, limit {limit}")]
    TooLarge { estimated: usize, limit: usize },
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl<P: WindowProcessor + ?Sized> WindowProcessor for &mut P {
    fn process(&mut self, window: &Window<'_>) -> Result<(), ProcessError> {
        (**self).process(window)
    }
}

impl<P: WindowProcessor + ?Sized> WindowProcessor for Box<P> {
    fn process(&mut self, window: &Window<'_>) -> Result<(), ProcessError> {
        (**self).process(window)
    }
}
