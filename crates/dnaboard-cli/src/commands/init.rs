//! The `dnaboard init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    if Path::new("dnaboard.toml").exists() {
        println!("dnaboard.toml already exists, skipping.");
    } else {
        std::fs::write("dnaboard.toml", SAMPLE_CONFIG)?;
        println!("Created dnaboard.toml");
    }

    std::fs::create_dir_all("question-banks")?;
    let bank_path = Path::new("question-banks/starter.toml");
    if bank_path.exists() {
        println!("question-banks/starter.toml already exists, skipping.");
    } else {
        std::fs::write(bank_path, STARTER_BANK)?;
        println!("Created question-banks/starter.toml");
    }

    println!("\nNext steps:");
    println!("  1. Run: dnaboard validate --bank question-banks");
    println!("  2. Run: dnaboard build --group 7R --save board.json");
    println!("  3. After the lesson: dnaboard session --board board.json --ratings 100,75,25,0,100,75");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# dnaboard configuration

default_capacity = 6
generator_timeout_ms = 2000

[store]
type = "file"
bank = "./question-banks"
data_dir = "./dnaboard-data"

# Hosted backend instead:
# [store]
# type = "rest"
# base_url = "https://your-project.supabase.co"
# api_key = "${DNABOARD_API_KEY}"
"#;

const STARTER_BANK: &str = r#"[bank]
id = "starter"
name = "Starter Bank"
description = "A small bank to get started"
domain = "Number"

[[items]]
id = "add"
topic = "Addition"
difficulty = "•"

[items.generator]
strategy = "arithmetic"
op = "+"
a = { min = 10, max = 99 }
b = { min = 10, max = 99 }

[[items]]
id = "times"
topic = "Multiplication"
difficulty = "••"

[items.generator]
strategy = "arithmetic"
op = "*"
a = { min = 2, max = 12 }
b = { min = 2, max = 12 }

[[items]]
id = "halves"
topic = "Fractions"
difficulty = "••"

[items.generator]
strategy = "template"
question = "Find $\\frac{{1}}{{2}}$ of ${2 * n}$"
answer = "${n}$"
vars = [{ name = "n", min = 3, max = 40 }]

[[items]]
id = "solve"
topic = "Equations"
domain = "Algebra"
difficulty = "•••"

[items.generator]
strategy = "linear_equation"

[[items]]
id = "square-area"
topic = "Area"
domain = "Geometry"
difficulty = "•"

[items.generator]
strategy = "template"
question = "A square has side ${s}$ cm. What is its area?"
answer = "${s * s}$ cm$^2$"
vars = [{ name = "s", min = 2, max = 12 }]

[[items]]
id = "right-angle"
topic = "Angles"
difficulty = "•"

[items.generator]
strategy = "static"
question = "How many degrees are in a right angle?"
answer = "$90°$"
"#;
