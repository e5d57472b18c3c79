use crate::types::{self, OperandError};

/// A command with its operands already typed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// `!loc <address>`: location-relative addressing.
    Loc(u32),
    /// `!gci <address>`: raw image offset addressing.
    Gci(u32),
    /// `!add <integer>`
    Add(i64),
    /// `!src <path>`
    Src(String),
    /// `!file <path>`
    File(String),
    /// `!geckocodelist <path>`
    GeckoCodelist(String),
    /// `!string "<text>"`
    String(String),
    /// Reference to an extracted `!asm` block.
    Asm(usize),
    AsmEnd,
    /// Reference to an extracted `!c2` block.
    C2 { address: u32, block: usize },
    C2End,
    Begin,
    End,
    /// `!echo "<text>"`
    Echo(String),
    /// `!asm` opener as written in the source; replaced when the script is loaded.
    AsmBlock,
    /// `!c2 <address>` opener as written in the source; replaced when the script is loaded.
    C2Block(u32),
}

/// One operation produced by a script line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    /// Binary literal text, including the leading `%`.
    Binary(String),
    /// Any other data line, with whitespace removed. Typed as hex when written.
    Hex(String),
    Command(Command),
    Warning(String),
    Error(OperandError),
}

/// Split a raw script line into its operations.
pub fn parse_line(line: &str) -> Vec<Op> {
    let text = strip_comment(line).trim();
    if text.is_empty() {
        return Vec::new();
    }

    if let Some(rest) = text.strip_prefix('!') {
        let (name, args) = match rest.find(char::is_whitespace) {
            Some(pos) => (&rest[..pos], rest[pos..].trim()),
            None => (rest, ""),
        };
        let mut ops = Vec::new();
        if args.ends_with(',') {
            ops.push(Op::Warning(format!("trailing comma after !{} operands", name)));
        }
        let operands = split_operands(args);
        ops.push(match parse_command(name, &operands) {
            Ok(command) => Op::Command(command),
            Err(e) => Op::Error(e),
        });
        return ops;
    }

    if text.starts_with('%') {
        return vec![Op::Binary(text.to_string())];
    }

    vec![Op::Hex(text.chars().filter(|c| !c.is_whitespace()).collect())]
}

fn parse_command(name: &str, args: &[String]) -> Result<Command, OperandError> {
    let expect = |expected: usize| {
        if args.len() == expected {
            Ok(())
        } else {
            Err(OperandError::OperandCount {
                command: name.to_string(),
                expected,
                found: args.len(),
            })
        }
    };

    let command = match name {
        "loc" => {
            expect(1)?;
            Command::Loc(types::address(&args[0])?)
        }
        "gci" => {
            expect(1)?;
            Command::Gci(types::address(&args[0])?)
        }
        "add" => {
            expect(1)?;
            Command::Add(types::integer(&args[0])?)
        }
        "src" => {
            expect(1)?;
            Command::Src(types::any(&args[0]))
        }
        "file" => {
            expect(1)?;
            Command::File(types::any(&args[0]))
        }
        "geckocodelist" => {
            expect(1)?;
            Command::GeckoCodelist(types::any(&args[0]))
        }
        "string" => {
            expect(1)?;
            Command::String(types::string(&args[0])?)
        }
        "echo" => {
            expect(1)?;
            Command::Echo(types::string(&args[0])?)
        }
        "asm" => {
            expect(0)?;
            Command::AsmBlock
        }
        "asmend" => {
            expect(0)?;
            Command::AsmEnd
        }
        "c2" => {
            expect(1)?;
            Command::C2Block(types::address(&args[0])?)
        }
        "c2end" => {
            expect(0)?;
            Command::C2End
        }
        "begin" => {
            expect(0)?;
            Command::Begin
        }
        "end" => {
            expect(0)?;
            Command::End
        }
        other => return Err(OperandError::UnknownCommand(other.to_string())),
    };
    Ok(command)
}

/// Cut a `#` comment, ignoring `#` inside double quotes.
fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Operands are separated by commas or whitespace; a quoted string is one operand.
fn split_operands(args: &str) -> Vec<String> {
    let mut operands = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in args.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                current.push(c);
            }
            c if !quoted && (c == ',' || c.is_whitespace()) => {
                if !current.is_empty() {
                    operands.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        operands.push(current);
    }
    operands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_comment_lines() {
        assert!(parse_line("").is_empty());
        assert!(parse_line("   # just a note").is_empty());
    }

    #[test]
    fn hex_and_binary() {
        assert_eq!(parse_line("DE AD BE EF # tail"), vec![Op::Hex("DEADBEEF".into())]);
        assert_eq!(parse_line("%0000 0001"), vec![Op::Binary("%0000 0001".into())]);
        assert_eq!(parse_line("x y z"), vec![Op::Hex("xyz".into())]);
    }

    #[test]
    fn addressing_commands() {
        assert_eq!(parse_line("!loc 80001000"), vec![Op::Command(Command::Loc(0x8000_1000))]);
        assert_eq!(parse_line("!gci 2060"), vec![Op::Command(Command::Gci(0x2060))]);
        assert_eq!(parse_line("!add 0x10"), vec![Op::Command(Command::Add(16))]);
    }

    #[test]
    fn quoted_operands_keep_spaces_and_hashes() {
        assert_eq!(
            parse_line("!string \"a # b, c\""),
            vec![Op::Command(Command::String("a # b, c".into()))]
        );
        assert_eq!(
            parse_line("!echo \"building\" # note"),
            vec![Op::Command(Command::Echo("building".into()))]
        );
    }

    #[test]
    fn file_commands_pass_paths_through() {
        assert_eq!(
            parse_line("!src lib/menu.mgc"),
            vec![Op::Command(Command::Src("lib/menu.mgc".into()))]
        );
        assert_eq!(
            parse_line("!file data.bin"),
            vec![Op::Command(Command::File("data.bin".into()))]
        );
    }

    #[test]
    fn block_openers() {
        assert_eq!(parse_line("!asm"), vec![Op::Command(Command::AsmBlock)]);
        assert_eq!(parse_line("!c2 80123456"), vec![Op::Command(Command::C2Block(0x8012_3456))]);
        assert_eq!(parse_line("!c2end"), vec![Op::Command(Command::C2End)]);
    }

    #[test]
    fn command_errors() {
        assert_eq!(
            parse_line("!warp 10"),
            vec![Op::Error(OperandError::UnknownCommand("warp".into()))]
        );
        assert_eq!(
            parse_line("!loc"),
            vec![Op::Error(OperandError::OperandCount {
                command: "loc".into(),
                expected: 1,
                found: 0
            })]
        );
        assert_eq!(
            parse_line("!loc 0x10"),
            vec![Op::Error(OperandError::BadAddress("0x10".into()))]
        );
    }

    #[test]
    fn trailing_comma_warns() {
        let ops = parse_line("!add 4,");
        assert!(matches!(ops[0], Op::Warning(_)));
        assert_eq!(ops[1], Op::Command(Command::Add(4)));
    }
}
