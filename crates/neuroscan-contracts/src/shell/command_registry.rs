#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
    pub arg_key: &'static str,
}

pub(crate) const SINGLE_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "analyze",
        action: "analyze",
        arg_key: "path",
    },
    CommandSpec {
        command: "upload",
        action: "upload",
        arg_key: "path",
    },
    CommandSpec {
        command: "open",
        action: "open_record",
        arg_key: "id",
    },
    CommandSpec {
        command: "report",
        action: "export_report",
        arg_key: "dir",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "reset",
        action: "reset",
        arg_key: "",
    },
    CommandSpec {
        command: "history",
        action: "show_history",
        arg_key: "",
    },
    CommandSpec {
        command: "discuss",
        action: "discuss",
        arg_key: "",
    },
    CommandSpec {
        command: "chat",
        action: "show_chat",
        arg_key: "",
    },
    CommandSpec {
        command: "home",
        action: "show_landing",
        arg_key: "",
    },
    CommandSpec {
        command: "console",
        action: "show_analyzer",
        arg_key: "",
    },
    CommandSpec {
        command: "print",
        action: "print_report",
        arg_key: "",
    },
    CommandSpec {
        command: "help",
        action: "help",
        arg_key: "",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
        arg_key: "",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
        arg_key: "",
    },
];

pub const SHELL_HELP_COMMANDS: &[&str] = &[
    "/upload <path>",
    "/analyze [path]",
    "/reset",
    "/console",
    "/history",
    "/open <id>",
    "/discuss",
    "/chat",
    "/report [dir]",
    "/print",
    "/home",
    "/help",
    "/quit",
];
