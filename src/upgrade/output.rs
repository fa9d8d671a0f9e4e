/// Progress reporting for a run. Plain lines to stdout, errors to stderr,
/// extra detail only when the run was started with the debug flag.
#[derive(Debug, Clone, Copy)]
pub struct OutputHandler {
    debug: bool,
}

impl OutputHandler {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    pub fn output(&self, message: impl AsRef<str>) {
        println!("{}", message.as_ref());
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        if self.debug {
            println!("{}", message.as_ref());
        }
    }

    pub fn error(&self, message: impl AsRef<str>) {
        eprintln!("{}", message.as_ref());
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }
}
