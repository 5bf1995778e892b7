#![deny(unsafe_code)]

use std::io::{self, Write};
use std::{env, process::ExitCode};

use is_terminal::IsTerminal;

fn main() -> ExitCode {
    let tty = zsplit_cli::TtyStatus {
        stdin: io::stdin().is_terminal(),
        stdout: io::stdout().is_terminal(),
    };

    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    let status = zsplit_cli::run(env::args_os(), stdin, &mut stdout, &mut stderr, tty);
    let _ = stdout.flush();
    zsplit_cli::exit_code_from(status)
}
