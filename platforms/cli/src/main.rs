use autolab::types::DEFAULT_WINDOW_RADIUS;
use autolab::{
    encode, evaluator, pda, Definition, FiniteAutomaton, Pipeline, ProgramLoader,
    ProgramManager, PushdownAutomaton, Stage, Step, Symbol, TuringMachine, TuringProgram,
};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::error::Error;
use std::path::Path;
use std::process::ExitCode;

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[clap(author, version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a definition on the given inputs
    Run {
        /// A `.aut` file, or the name of a built-in program
        program: String,

        /// Tape contents for a turing machine, or words to test for an automaton
        #[clap(short, long)]
        input: Vec<String>,

        /// Print each step of a turing machine execution
        #[clap(short = 'd', long)]
        debug: bool,

        /// Print results as JSON
        #[clap(long)]
        json: bool,
    },
    /// Convert a finite automaton into a unit-label, deterministic or minimal automaton
    Convert {
        /// A `.aut` file, or the name of a built-in program
        program: String,

        #[clap(short, long, value_enum, default_value_t = StageArg::Min)]
        stage: StageArg,

        /// Print the automaton as JSON instead of the definition format
        #[clap(long)]
        json: bool,
    },
    /// List the built-in programs
    List,
}

#[derive(Clone, Copy, ValueEnum)]
enum StageArg {
    Unit,
    Dfa,
    Min,
}

impl From<StageArg> for Stage {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Unit => Stage::Unit,
            StageArg::Dfa => Stage::Dfa,
            StageArg::Min => Stage::Minimal,
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run {
            program,
            input,
            debug,
            json,
        } => load(&program).and_then(|definition| run(definition, &input, debug, json)),
        Command::Convert {
            program,
            stage,
            json,
        } => load(&program).and_then(|definition| convert(definition, stage.into(), json)),
        Command::List => list(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Loads a definition from a file, falling back to the built-in catalog.
fn load(program: &str) -> Result<Definition, Box<dyn Error>> {
    let path = Path::new(program);
    if path.exists() {
        return Ok(ProgramLoader::load_program(path)?);
    }

    log::debug!("{} is not a file, looking it up in the catalog", program);
    Ok(ProgramManager::by_name(program)?)
}

fn run(definition: Definition, inputs: &[String], debug: bool, json: bool) -> CliResult {
    match definition {
        Definition::Turing(program) => run_turing(program, inputs, debug, json),
        Definition::Finite(automaton) => run_finite(&automaton, inputs, json),
        Definition::Pushdown(automaton) => run_pushdown(&automaton, inputs, json),
    }
}

fn run_turing(program: TuringProgram, inputs: &[String], debug: bool, json: bool) -> CliResult {
    if inputs.len() > program.tape_count() {
        return Err(format!(
            "{} inputs given for a machine with {} tapes",
            inputs.len(),
            program.tape_count()
        )
        .into());
    }

    let tapes: Vec<Vec<Symbol>> = program
        .tapes
        .iter()
        .enumerate()
        .map(|(i, initial)| match inputs.get(i) {
            Some(input) => input.chars().map(parse_cell).collect(),
            None => initial.clone(),
        })
        .collect();

    let mut machine = TuringMachine::new(program)?;
    machine.reset_with(&tapes)?;

    let step = if debug {
        print_state(&machine);
        loop {
            match machine.step() {
                Step::Continue => print_state(&machine),
                halt => {
                    println!();
                    break halt;
                }
            }
        }
    } else {
        machine.run()
    };

    if json {
        let tapes: Vec<String> = machine.tapes().iter().map(|t| t.to_string()).collect();
        let output = json!({
            "status": machine.status(),
            "state": machine.state(),
            "steps": machine.step_count(),
            "halt": machine.halt_reason(),
            "tapes": tapes,
            "snapshot": machine.snapshot(DEFAULT_WINDOW_RADIUS),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match step {
        Step::Continue => println!(
            "Stopped after {} steps without halting, in state {}",
            machine.step_count(),
            machine.state()
        ),
        halt => println!("{} after {} steps", halt, machine.step_count()),
    }
    for tape in machine.tapes() {
        println!("{tape}");
    }

    Ok(())
}

fn print_state(machine: &TuringMachine) {
    let tapes = machine
        .tapes()
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    println!(
        "Step: {}, State: {}, Tapes: [{}], Heads: {:?}",
        machine.step_count(),
        machine.state(),
        tapes,
        machine.heads()
    );
}

/// `_` on the command line is a blank cell.
fn parse_cell(c: char) -> Symbol {
    match c {
        '_' => Symbol::Blank,
        c => Symbol::Mark(c),
    }
}

fn run_finite(automaton: &FiniteAutomaton, inputs: &[String], json: bool) -> CliResult {
    let results: Vec<_> = inputs
        .iter()
        .map(|word| (word, evaluator::evaluate(automaton, word)))
        .collect();

    if json {
        let output: Vec<_> = results
            .iter()
            .map(|(word, evaluation)| json!({ "input": word, "result": evaluation }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for (word, evaluation) in &results {
            println!("{:?}: {}", word, evaluation);
        }
    }

    Ok(())
}

fn run_pushdown(automaton: &PushdownAutomaton, inputs: &[String], json: bool) -> CliResult {
    let results: Vec<_> = inputs
        .iter()
        .map(|word| (word, pda::evaluate(automaton, word)))
        .collect();

    if json {
        let output: Vec<_> = results
            .iter()
            .map(|(word, outcome)| json!({ "input": word, "result": outcome }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for (word, outcome) in &results {
            println!("{:?}: {}", word, outcome);
        }
    }

    Ok(())
}

fn convert(definition: Definition, stage: Stage, json: bool) -> CliResult {
    let automaton = match definition {
        Definition::Finite(automaton) => automaton,
        other => {
            return Err(format!(
                "convert needs a finite automaton, '{}' is a {} definition",
                other.name(),
                other.kind()
            )
            .into())
        }
    };

    let pipeline = Pipeline::run(&automaton)?;
    let result = pipeline.stage(stage).clone();
    log::info!(
        "{} states and {} transitions after conversion",
        result.states.len(),
        result.transition_count()
    );

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", encode(&Definition::Finite(result)));
    }

    Ok(())
}

fn list() -> CliResult {
    for index in 0..ProgramManager::count() {
        let info = ProgramManager::info(index)?;
        println!(
            "{:>2}  {:<24} {:<9} {} states, {} transitions",
            info.index,
            info.name,
            info.kind.to_string(),
            info.state_count,
            info.transition_count
        );
    }

    Ok(())
}
