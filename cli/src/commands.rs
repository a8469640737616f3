//! Line commands read from stdin.

use anyhow::{Context, Result, anyhow, bail};
use cyrano_engine::Command;
use cyrano_types::{GroupId, MAX_BRANCHES};

pub(crate) const HELP: &str = "\
commands:
  list             show available scripts
  start <id>       run the script with that id
  next | prev      step forward or back
  goto <n>         jump to instruction n
  branch <1-4>     follow a branch button
  pause | resume   pause or resume playback
  stop             stop the script (when allowed)
  exit             leave the script
  help             show this text
  quit             leave cyrano";

/// What a line asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Input {
    Engine(Command),
    Help,
    Quit,
}

/// Parse one line. Blank lines yield `None`.
pub(crate) fn parse_line(line: &str) -> Result<Option<Input>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();
    if let Some(extra) = words.next() {
        bail!("unexpected argument `{extra}`");
    }

    let verb = verb.to_ascii_lowercase();
    let command = match verb.as_str() {
        "start" => Command::StartScript(GroupId::new(number(&verb, arg)?)),
        "goto" => Command::Goto(number(&verb, arg)?),
        "branch" | "b" => {
            let slot = number(&verb, arg)?;
            let slot = usize::try_from(slot)
                .ok()
                .filter(|slot| (1..=MAX_BRANCHES).contains(slot))
                .ok_or_else(|| anyhow!("branch must be between 1 and {MAX_BRANCHES}"))?;
            Command::Branch(slot - 1)
        }
        bare => {
            if let Some(extra) = arg {
                bail!("`{bare}` takes no argument, got `{extra}`");
            }
            match bare {
                "list" | "ls" => Command::RefreshCatalog,
                "next" | "n" => Command::Next,
                "prev" | "previous" | "p" => Command::Previous,
                "pause" => Command::Pause,
                "resume" | "play" => Command::Resume,
                "stop" => Command::Stop,
                "exit" | "back" => Command::Exit,
                "help" | "?" => return Ok(Some(Input::Help)),
                "quit" | "q" => return Ok(Some(Input::Quit)),
                other => bail!("unknown command `{other}` (try `help`)"),
            }
        }
    };
    Ok(Some(Input::Engine(command)))
}

fn number(verb: &str, arg: Option<&str>) -> Result<i64> {
    let arg = arg.ok_or_else(|| anyhow!("`{verb}` needs a number"))?;
    arg.parse()
        .with_context(|| format!("`{arg}` is not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(line: &str) -> Command {
        match parse_line(line).unwrap() {
            Some(Input::Engine(command)) => command,
            other => panic!("expected an engine command, got {other:?}"),
        }
    }

    #[test]
    fn parses_navigation() {
        assert_eq!(engine("next"), Command::Next);
        assert_eq!(engine("  PREV "), Command::Previous);
        assert_eq!(engine("goto 3"), Command::Goto(3));
        assert_eq!(engine("start 12"), Command::StartScript(GroupId::new(12)));
        assert_eq!(engine("list"), Command::RefreshCatalog);
        assert_eq!(engine("exit"), Command::Exit);
    }

    #[test]
    fn branch_numbers_are_one_based() {
        assert_eq!(engine("branch 1"), Command::Branch(0));
        assert_eq!(engine("b 4"), Command::Branch(3));
        assert!(parse_line("branch 0").is_err());
        assert!(parse_line("branch 5").is_err());
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("   ").unwrap().is_none());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_line("dance").is_err());
        assert!(parse_line("goto").is_err());
        assert!(parse_line("goto three").is_err());
        assert!(parse_line("next 2").is_err());
        assert!(parse_line("quit now").is_err());
        assert!(parse_line("goto 1 2").is_err());
    }

    #[test]
    fn local_inputs() {
        assert_eq!(parse_line("quit").unwrap(), Some(Input::Quit));
        assert_eq!(parse_line("help").unwrap(), Some(Input::Help));
    }
}
