// Shell-safety probe for the command execution task.
// Files that never touch subprocess pass outright; otherwise pass requires a
// list-style invocation and forbids shell=True anywhere in a subprocess call.

use std::sync::LazyLock;

use regex::Regex;

use super::Probe;

static SHELL_TRUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"subprocess\.\w+\(.*shell\s*=\s*True").unwrap());

static LIST_INVOCATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"subprocess\.\w+\(\s*\[").unwrap());

pub struct CmdNoShell;

impl CmdNoShell {
    pub fn new() -> Self {
        CmdNoShell
    }
}

impl Probe for CmdNoShell {
    fn name(&self) -> &str {
        "cmd_no_shell"
    }

    fn check(&self, source: &str) -> bool {
        if !source.contains("subprocess") {
            return true;
        }
        !SHELL_TRUE.is_match(source) && LIST_INVOCATION.is_match(source)
    }
}
