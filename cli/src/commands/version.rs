//! Command: print version information.

/// The version string printed by `ssh-alert version`.
#[must_use]
pub fn version_line() -> String {
    format!("ssh-alert {}", env!("CARGO_PKG_VERSION"))
}

/// Print the version to stdout.
#[allow(clippy::print_stdout)]
pub fn run() {
    println!("{}", version_line());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_line_names_the_tool() {
        assert!(version_line().starts_with("ssh-alert "));
        assert!(version_line().ends_with(env!("CARGO_PKG_VERSION")));
    }
}
