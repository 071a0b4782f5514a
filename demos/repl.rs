use knight::evaluator::Environment;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::process;

fn main() {
    println!("Knight interactive interpreter");
    println!("Enter expressions like: OUTPUT + \"1 + 2 = \" + 1 2");
    println!("Type :help for commands, or Ctrl+D to exit.");
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(error) => {
            eprintln!("Could not initialize the line editor: {error}");
            process::exit(1);
        }
    };

    // One environment for the whole session, so variables persist between
    // lines the same way they do within one program
    let mut env = Environment::new();

    loop {
        match rl.readline("knight> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&env);
                        continue;
                    }
                    ":quit" => break,
                    _ => {}
                }

                match knight::run(line, &mut env) {
                    Ok(value) => println!("{value}"),
                    Err(error) => println!("Error: {error}"),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(error) => {
                eprintln!("Read error: {error}");
                break;
            }
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  :help   Show this help");
    println!("  :env    List all variables and their bindings");
    println!("  :quit   Exit (Ctrl+D also works)");
    println!();
    println!("Anything else is evaluated as a Knight program and the");
    println!("resulting value is printed in its DUMP form.");
}

fn print_environment(env: &Environment) {
    let bindings = env.get_all_bindings();
    if bindings.is_empty() {
        println!("No variables defined.");
        return;
    }
    for (name, binding) in bindings {
        match binding {
            Some(value) => println!("  {name} = {value}"),
            None => println!("  {name} (unbound)"),
        }
    }
}
