use std::{env, fs, process::ExitCode};

use sable::check_source;

const USAGE: &str = "usage: sablec FILE.sb [-b] [--dump-ast]

  -b          skip borrow checking
  --dump-ast  print the analyzed syntax tree";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut file_path: Option<&str> = None;
    let mut skip_borrow_check = false;
    let mut dump_ast = false;

    for arg in &args {
        match arg.as_str() {
            "-b" => skip_borrow_check = true,
            "--dump-ast" => dump_ast = true,
            "-h" | "--help" => {
                println!("{USAGE}");
                return ExitCode::SUCCESS;
            }
            _ if arg.starts_with('-') => {
                eprintln!("error: unknown option {arg}\n{USAGE}");
                return ExitCode::FAILURE;
            }
            _ => {
                if file_path.is_some() {
                    eprintln!("error: more than one input file\n{USAGE}");
                    return ExitCode::FAILURE;
                }
                file_path = Some(arg.as_str());
            }
        }
    }

    let Some(file_path) = file_path else {
        eprintln!("error: no input file\n{USAGE}");
        return ExitCode::FAILURE;
    };

    let source = match read_file(file_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let analysis = check_source(&source, skip_borrow_check);

    if dump_ast {
        for &decl in &analysis.decls {
            print!("{}", analysis.ast.dump_decl(decl, &analysis.types));
        }
    }

    if analysis.passed() {
        ExitCode::SUCCESS
    } else {
        for diagnostic in &analysis.diagnostics {
            eprint!("{diagnostic}");
        }
        ExitCode::FAILURE
    }
}

fn read_file(file_path: &str) -> Result<String, String> {
    match fs::metadata(file_path) {
        Ok(metadata) => {
            if !metadata.is_file() {
                return Err(format!("{file_path} is not a file"));
            }
        }
        Err(err) => {
            return Err(format!("could not read {file_path}: {err}"));
        }
    }
    fs::read_to_string(file_path).map_err(|err| format!("could not read {file_path}: {err}"))
}
