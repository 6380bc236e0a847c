/// Name of one observable value across logs, journal entries and metrics.
#[derive(Debug, Clone, Copy)]
pub struct Tag {
    pub key: &'static str,
    pub metric: &'static str,
}

pub const LINES_CONSUMED: Tag = Tag {
    key: "lines_consumed",
    metric: "stage_lines_consumed_total",
};

pub const COMMANDS_APPLIED: Tag = Tag {
    key: "commands_applied",
    metric: "stage_commands_applied_total",
};

pub const LINES_IGNORED: Tag = Tag {
    key: "lines_ignored",
    metric: "stage_lines_ignored_total",
};

pub const TRUNCATED_BYTES: Tag = Tag {
    key: "truncated_bytes",
    metric: "stage_truncated_bytes_total",
};

pub const BUSY_DROPS: Tag = Tag {
    key: "busy_drops",
    metric: "stage_busy_dropped_bytes_total",
};

pub const ECHO_DROPS: Tag = Tag {
    key: "echo_drops",
    metric: "stage_echo_dropped_bytes_total",
};

pub const SPINDLE_LEVEL: Tag = Tag {
    key: "spindle_level",
    metric: "stage_spindle_level",
};

pub const SPINDLE_ENABLED: Tag = Tag {
    key: "spindle_enabled",
    metric: "stage_spindle_enabled",
};

/// Labelled by `axis`.
pub const AXIS_STEP: Tag = Tag {
    key: "step",
    metric: "stage_axis_step_level",
};

/// Labelled by `axis`.
pub const AXIS_DIR: Tag = Tag {
    key: "dir",
    metric: "stage_axis_dir_level",
};
