const USAGE: &str = concat!(
    "askaway: keeps a standing instruction in front of the coding assistant\n\n",
    "Serves host hooks as JSON lines on stdin/stdout.\n\n",
    "Environment:\n",
    "  OPENCODE_AA_LOG=1          write debug logs to ./.logs/user-instructions.log\n",
    "  OPENCODE_AA_ENABLED=0      start with injection disabled\n",
    "  OPENCODE_AA_SERVER_URL=... host server receiving /aa replies\n\n",
    "In chat:\n",
    "  /aa                  show help, status and the current instruction\n",
    "  /aa <text>           replace the instruction\n",
    "  /aa -r, --restore    restore the default instruction\n",
    "  /aa -o | on | off    toggle, enable or disable injection\n",
);

/// Handle special one-shot CLI commands like `--help` or `--version`.
/// Returns true if a special action was handled and the program should exit.
pub fn handle_specials_if_needed() -> bool {
    let mut args = std::env::args();
    let _ = args.next(); // binary name

    let arg = args.next().unwrap_or_default();

    if matches!(arg.as_str(), "help" | "--help" | "-H" | "-h" | "-?") {
        println!("{USAGE}");
        return true;
    }

    if matches!(arg.as_str(), "version" | "--version" | "-V" | "-v") {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return true;
    }

    false
}
