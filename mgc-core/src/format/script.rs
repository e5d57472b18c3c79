use std::path::{Path, PathBuf};

use crate::asm::{self, BlockAssembler};
use crate::types::OperandError;

use super::line::{parse_line, Command, Op};

/// One source line that produced at least one operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptLine {
    /// 1-based line number in the source file.
    pub number: usize,
    pub ops: Vec<Op>,
}

/// The kind of file a script command refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FileKind {
    Script,
    Binary,
    CodeList,
}

/// A loaded MGC script.
///
/// `!begin`/`!end` windows are applied and `!asm`/`!c2` blocks are extracted
/// at load time, so the lines only hold operations the engine executes.
#[derive(Clone, Debug)]
pub struct ScriptFile {
    path: PathBuf,
    lines: Vec<ScriptLine>,
    blocks: Vec<Vec<u8>>,
}

impl ScriptFile {
    pub fn parse(path: impl Into<PathBuf>, text: &str, assembler: &dyn BlockAssembler) -> Self {
        let raw: Vec<&str> = text.lines().collect();
        let parsed: Vec<Vec<Op>> = raw.iter().map(|line| parse_line(line)).collect();

        let (start, end) = active_window(&parsed);
        let mut lines = Vec::new();
        let mut blocks = Vec::new();

        let mut i = start;
        while i < end {
            let mut ops = parsed[i].clone();
            if let Some(pos) = ops.iter().position(is_block_opener) {
                let closer = find_closer(&parsed, &ops[pos], i + 1, end);
                match closer {
                    Some(close) => {
                        let body = &raw[i + 1..close];
                        ops[pos] = match extract_block(&ops[pos], body, assembler, blocks.len()) {
                            Ok((op, blob)) => {
                                blocks.push(blob);
                                op
                            }
                            Err(e) => Op::Error(e),
                        };
                        lines.push(ScriptLine { number: i + 1, ops });
                        i = close + 1;
                        continue;
                    }
                    None => {
                        ops[pos] = Op::Error(OperandError::UnterminatedBlock(opener_name(&ops[pos])));
                    }
                }
            }
            if !ops.is_empty() {
                lines.push(ScriptLine { number: i + 1, ops });
            }
            i += 1;
        }

        Self {
            path: path.into(),
            lines,
            blocks,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory that relative references in this script resolve against.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    pub fn block(&self, index: usize) -> Option<&[u8]> {
        self.blocks.get(index).map(Vec::as_slice)
    }

    /// Every file referenced by `!src`, `!file` and `!geckocodelist`, with its line number.
    pub fn references(&self) -> impl Iterator<Item = (FileKind, &str, usize)> + '_ {
        self.lines.iter().flat_map(|line| {
            line.ops.iter().filter_map(move |op| match op {
                Op::Command(Command::Src(path)) => Some((FileKind::Script, path.as_str(), line.number)),
                Op::Command(Command::File(path)) => Some((FileKind::Binary, path.as_str(), line.number)),
                Op::Command(Command::GeckoCodelist(path)) => {
                    Some((FileKind::CodeList, path.as_str(), line.number))
                }
                _ => None,
            })
        })
    }
}

fn has_command(ops: &[Op], wanted: &Command) -> bool {
    ops.iter().any(|op| matches!(op, Op::Command(c) if c == wanted))
}

/// Lines between the first `!begin` and the first `!end` after it, or the whole file.
fn active_window(parsed: &[Vec<Op>]) -> (usize, usize) {
    let Some(begin) = parsed.iter().position(|ops| has_command(ops, &Command::Begin)) else {
        return (0, parsed.len());
    };
    let end = parsed[begin + 1..]
        .iter()
        .position(|ops| has_command(ops, &Command::End))
        .map(|offset| begin + 1 + offset)
        .unwrap_or(parsed.len());
    (begin + 1, end)
}

fn is_block_opener(op: &Op) -> bool {
    matches!(op, Op::Command(Command::AsmBlock | Command::C2Block(_)))
}

fn opener_name(op: &Op) -> String {
    match op {
        Op::Command(Command::C2Block(_)) => "c2".to_string(),
        _ => "asm".to_string(),
    }
}

fn find_closer(parsed: &[Vec<Op>], opener: &Op, from: usize, end: usize) -> Option<usize> {
    let closer = match opener {
        Op::Command(Command::C2Block(_)) => Command::C2End,
        _ => Command::AsmEnd,
    };
    (from..end).find(|&i| has_command(&parsed[i], &closer))
}

fn extract_block(
    opener: &Op,
    body: &[&str],
    assembler: &dyn BlockAssembler,
    index: usize,
) -> Result<(Op, Vec<u8>), OperandError> {
    let assembled = assembler.assemble(body)?;
    match opener {
        Op::Command(Command::C2Block(address)) => Ok((
            Op::Command(Command::C2 {
                address: *address,
                block: index,
            }),
            asm::c2_code(*address, &assembled)?,
        )),
        _ => Ok((Op::Command(Command::Asm(index)), assembled)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::HexBlockAssembler;
    use crate::types::to_hex;

    fn parse(text: &str) -> ScriptFile {
        ScriptFile::parse("/mods/test.mgc", text, &HexBlockAssembler)
    }

    #[test]
    fn keeps_line_numbers_and_skips_blanks() {
        let script = parse("# header\n\n!loc 80001000\nDEADBEEF\n");
        let numbers: Vec<usize> = script.lines().iter().map(|l| l.number).collect();
        assert_eq!(numbers, vec![3, 4]);
        assert_eq!(script.directory(), Path::new("/mods"));
    }

    #[test]
    fn begin_end_window() {
        let script = parse("AA\n!begin\nBB\n!end\nCC\n");
        assert_eq!(script.lines().len(), 1);
        assert_eq!(script.lines()[0].ops, vec![Op::Hex("BB".into())]);
    }

    #[test]
    fn repeated_begin_is_kept_for_warning() {
        let script = parse("!begin\n!begin\nBB\n");
        assert_eq!(script.lines()[0].ops, vec![Op::Command(Command::Begin)]);
        assert_eq!(script.lines().len(), 2);
    }

    #[test]
    fn asm_blocks_are_extracted() {
        let script = parse("!asm\n38600001\n4E800020\n!asmend\n!asm\n.long 1\n!asmend\nFF\n");
        assert_eq!(script.lines()[0].ops, vec![Op::Command(Command::Asm(0))]);
        assert_eq!(script.lines()[1].ops, vec![Op::Command(Command::Asm(1))]);
        assert_eq!(script.lines()[2].number, 8);
        assert_eq!(to_hex(script.block(0).unwrap()), "386000014E800020");
        assert_eq!(to_hex(script.block(1).unwrap()), "00000001");
        assert!(script.block(2).is_none());
    }

    #[test]
    fn c2_blocks_are_wrapped() {
        let script = parse("!c2 80123456\n38600001\n!c2end\n");
        assert_eq!(
            script.lines()[0].ops,
            vec![Op::Command(Command::C2 {
                address: 0x8012_3456,
                block: 0
            })]
        );
        assert_eq!(to_hex(script.block(0).unwrap()), "C2123456000000013860000100000000");
    }

    #[test]
    fn stray_closer_stays_a_command() {
        let script = parse("!asmend\n");
        assert_eq!(script.lines()[0].ops, vec![Op::Command(Command::AsmEnd)]);
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let script = parse("!asm\n38600001\n");
        assert_eq!(
            script.lines()[0].ops,
            vec![Op::Error(OperandError::UnterminatedBlock("asm".into()))]
        );
    }

    #[test]
    fn references_are_listed() {
        let script = parse("!src a.mgc\n!file b.bin\n!geckocodelist c.txt\n");
        let refs: Vec<_> = script.references().collect();
        assert_eq!(
            refs,
            vec![
                (FileKind::Script, "a.mgc", 1),
                (FileKind::Binary, "b.bin", 2),
                (FileKind::CodeList, "c.txt", 3),
            ]
        );
    }
}
