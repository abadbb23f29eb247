use structopt::StructOpt;

/// Runtime configuration. Every switch is a runtime value; nothing in the
/// core branches on compilation mode.
#[derive(StructOpt, Debug, Clone)]
pub struct RuntimeOptions {
    #[structopt(
        long = "heapThreshold",
        default_value = "262144",
        help = "Initial collection threshold in bytes"
    )]
    pub heap_threshold: usize,
    #[structopt(long = "disableIC", help = "Disable inline cache stamping on property hits")]
    pub disable_ic: bool,
    #[structopt(
        long = "freezeBuiltinsFatalOnOverride",
        help = "Abort instead of raising TypeError when a read-only builtin method is assigned to"
    )]
    pub freeze_builtins_fatal_on_override: bool,
    #[structopt(long = "verboseGC", help = "Print statistics after every collection cycle")]
    pub verbose_gc: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            heap_threshold: 256 * 1024,
            disable_ic: false,
            freeze_builtins_fatal_on_override: false,
            verbose_gc: false,
        }
    }
}

impl RuntimeOptions {
    pub fn with_heap_threshold(mut self, threshold: usize) -> Self {
        self.heap_threshold = threshold;
        self
    }

    pub fn with_disable_ic(mut self, disable: bool) -> Self {
        self.disable_ic = disable;
        self
    }

    pub fn with_freeze_builtins_fatal_on_override(mut self, fatal: bool) -> Self {
        self.freeze_builtins_fatal_on_override = fatal;
        self
    }

    pub fn with_verbose_gc(mut self, verbose: bool) -> Self {
        self.verbose_gc = verbose;
        self
    }
}
