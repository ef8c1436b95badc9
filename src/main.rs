use std::{env, fs, process};

use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use ls8_sim::{loader, Vm};

fn main() {
    let level = if env::var_os("LS8_TRACE").is_some() {
        LevelFilter::Trace
    } else {
        LevelFilter::Warn
    };
    TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto).unwrap();

    let path = match env::args().nth(1) {
        Some(path) => path,
        None => {
            eprintln!("usage: ls8-sim <program.ls8>");
            process::exit(1);
        }
    };

    let source = match fs::read_to_string(&path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{path}: {err}");
            process::exit(1);
        }
    };

    let program = loader::parse_program(&source);
    let mut vm = Vm::new();
    if let Err(err) = vm.load(&program).and_then(|_| vm.run()) {
        eprintln!("{path}: {err}");
        process::exit(1);
    }
}
