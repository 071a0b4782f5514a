use std::env;
use std::fs;
use std::process;

use knight::evaluator::Environment;

const USAGE: &str = "usage: knight (-e <expression> | <file>)";

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|arg| arg == "-h" || arg == "--help") {
        println!("{USAGE}");
        return;
    }

    let source = match args.as_slice() {
        [flag, expression] if flag == "-e" => expression.clone(),
        [path] => match fs::read_to_string(path) {
            Ok(source) => source,
            Err(error) => {
                eprintln!("knight: cannot read {path}: {error}");
                process::exit(2);
            }
        },
        _ => {
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };

    // The program's value is discarded; only its side effects matter
    let mut env = Environment::new();
    if let Err(error) = knight::run(&source, &mut env) {
        eprintln!("knight: {error}");
        process::exit(1);
    }
}
