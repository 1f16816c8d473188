//! Line-oriented command scripts that replay editor interactions.
//!
//! Each non-empty line is one command; `#` starts a comment. Pointer
//! commands take view coordinates (affected by `zoom`), the `rect`, `paint`
//! and `erase` commands take image coordinates.
//!
//! ```text
//! # remove a logo in the lower right corner
//! radius 5
//! tool rect
//! press 900 620
//! release 1010 700
//! save cleaned.png
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::inpaint::MethodChoice;
use crate::mask::Rect;
use crate::session::{Session, Tool};

/// Zoom adjustment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Zoom {
    /// One step in.
    In,
    /// One step out.
    Out,
    /// Back to 100%.
    Reset,
    /// Multiply by a factor.
    By(f32),
}

/// A single script command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `tool rect|brush|eraser`
    Tool(Tool),
    /// `toggle`: swap brush and eraser.
    Toggle,
    /// `brush N`: brush radius.
    Brush(u32),
    /// `radius N`: inpainting radius.
    Radius(u32),
    /// `method auto|telea|ns`
    Method(MethodChoice),
    /// `zoom in|out|reset|FACTOR`
    Zoom(Zoom),
    /// `press X Y` in view coordinates.
    Press(f32, f32),
    /// `drag X Y` in view coordinates.
    Drag(f32, f32),
    /// `release X Y` in view coordinates; commits.
    Release(f32, f32),
    /// `rect X0 Y0 X1 Y1` in image coordinates; does not commit.
    Rect((i32, i32), (i32, i32)),
    /// `paint X Y` in image coordinates; does not commit.
    Paint(i32, i32),
    /// `erase X Y` in image coordinates; does not commit.
    Erase(i32, i32),
    /// `apply`: commit pending mask edits.
    Apply,
    /// `undo`
    Undo,
    /// `redo`
    Redo,
    /// `save PATH`
    Save(PathBuf),
}

fn numbers<T: FromStr>(args: &[&str], expected: usize) -> std::result::Result<Vec<T>, String>
where
    T::Err: fmt::Display,
{
    if args.len() != expected {
        return Err(format!("expected {expected} numbers, got {}", args.len()));
    }
    args.iter()
        .map(|a| a.parse::<T>().map_err(|e| format!("`{a}`: {e}")))
        .collect()
}

fn no_args(name: &str, args: &[&str]) -> std::result::Result<(), String> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(format!("`{name}` takes no arguments"))
    }
}

/// Drop a trailing comment: `#` at the start of the line or after
/// whitespace. A `#` inside a word (for example in a path) is kept.
fn strip_comment(line: &str) -> &str {
    let mut prev_blank = true;
    for (i, c) in line.char_indices() {
        if c == '#' && prev_blank {
            return &line[..i];
        }
        prev_blank = c.is_whitespace();
    }
    line
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, String> {
        let line = line.trim();
        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let name = name.to_ascii_lowercase();
        let name = name.as_str();
        let rest = rest.trim();
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match name {
            "tool" => Self::Tool(rest.parse().map_err(|e: Error| e.to_string())?),
            "toggle" => {
                no_args(name, &args)?;
                Self::Toggle
            }
            "brush" => Self::Brush(numbers::<u32>(&args, 1)?[0]),
            "radius" => Self::Radius(numbers::<u32>(&args, 1)?[0]),
            "method" => Self::Method(rest.parse().map_err(|e: Error| e.to_string())?),
            "zoom" => Self::Zoom(match rest.to_ascii_lowercase().as_str() {
                "in" => Zoom::In,
                "out" => Zoom::Out,
                "reset" => Zoom::Reset,
                factor => Zoom::By(numbers::<f32>(&args, 1).map_err(|_| {
                    format!("expected in, out, reset or a factor, got `{factor}`")
                })?[0]),
            }),
            "press" | "drag" | "release" => {
                let v: Vec<f32> = numbers(&args, 2)?;
                match name {
                    "press" => Self::Press(v[0], v[1]),
                    "drag" => Self::Drag(v[0], v[1]),
                    _ => Self::Release(v[0], v[1]),
                }
            }
            "rect" => {
                let v: Vec<i32> = numbers(&args, 4)?;
                Self::Rect((v[0], v[1]), (v[2], v[3]))
            }
            "paint" | "erase" => {
                let v: Vec<i32> = numbers(&args, 2)?;
                if name == "paint" {
                    Self::Paint(v[0], v[1])
                } else {
                    Self::Erase(v[0], v[1])
                }
            }
            "apply" => {
                no_args(name, &args)?;
                Self::Apply
            }
            "undo" => {
                no_args(name, &args)?;
                Self::Undo
            }
            "redo" => {
                no_args(name, &args)?;
                Self::Redo
            }
            "save" => {
                if rest.is_empty() {
                    return Err("`save` needs a path".to_string());
                }
                Self::Save(PathBuf::from(rest))
            }
            other => return Err(format!("unknown command `{other}`")),
        };
        Ok(command)
    }
}

impl Command {
    /// Apply the command to a session.
    ///
    /// # Errors
    ///
    /// Propagates inpainting and save errors.
    pub fn execute(&self, session: &mut Session) -> Result<()> {
        match self {
            Self::Tool(tool) => session.set_tool(*tool),
            Self::Toggle => session.toggle_eraser(),
            Self::Brush(size) => session.set_brush_size(*size),
            Self::Radius(radius) => session.set_radius(*radius),
            Self::Method(method) => session.set_method(*method),
            Self::Zoom(Zoom::In) => session.zoom_in(),
            Self::Zoom(Zoom::Out) => session.zoom_out(),
            Self::Zoom(Zoom::Reset) => session.reset_zoom(),
            Self::Zoom(Zoom::By(factor)) => session.zoom_by(*factor),
            Self::Press(x, y) => session.press((*x, *y)),
            Self::Drag(x, y) => session.drag((*x, *y)),
            Self::Release(x, y) => {
                session.release((*x, *y))?;
            }
            Self::Rect(a, b) => session.mark_rect(Rect::from_corners(*a, *b)),
            Self::Paint(x, y) => session.paint((*x, *y), false),
            Self::Erase(x, y) => session.paint((*x, *y), true),
            Self::Apply => {
                session.apply()?;
            }
            Self::Undo => {
                session.undo();
            }
            Self::Redo => {
                session.redo();
            }
            Self::Save(path) => session.save(path)?,
        }
        Ok(())
    }
}

/// A parsed script: commands with their 1-based line numbers.
#[derive(Debug, Clone, Default)]
pub struct Script {
    commands: Vec<(usize, Command)>,
}

impl Script {
    /// Parse script text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Script`] for the first line that fails to parse.
    pub fn parse(text: &str) -> Result<Self> {
        let mut commands = Vec::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }
            let command = line.parse::<Command>().map_err(|message| Error::Script {
                line: idx + 1,
                message,
            })?;
            commands.push((idx + 1, command));
        }
        Ok(Self { commands })
    }

    /// Read and parse a script file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, or [`Error::Script`]
    /// for a malformed line.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// The parsed commands.
    #[must_use]
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter().map(|(_, c)| c)
    }

    /// Number of commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the script has no commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run every command against `session`, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Script`] naming the failing line.
    pub fn run(&self, session: &mut Session) -> Result<()> {
        for (line, command) in &self.commands {
            log::debug!("line {line}: {command:?}");
            command.execute(session).map_err(|e| Error::Script {
                line: *line,
                message: e.to_string(),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inpaint::Method;
    use image::{Rgb, RgbImage};

    #[test]
    fn parses_every_command() {
        let cases = [
            ("tool brush", Command::Tool(Tool::Brush)),
            ("toggle", Command::Toggle),
            ("brush 12", Command::Brush(12)),
            ("radius 3", Command::Radius(3)),
            ("method ns", Command::Method(MethodChoice::Fixed(Method::NavierStokes))),
            ("zoom in", Command::Zoom(Zoom::In)),
            ("zoom reset", Command::Zoom(Zoom::Reset)),
            ("zoom 1.5", Command::Zoom(Zoom::By(1.5))),
            ("press 1 2.5", Command::Press(1.0, 2.5)),
            ("drag 3 4", Command::Drag(3.0, 4.0)),
            ("release 5 6", Command::Release(5.0, 6.0)),
            ("rect 1 2 3 4", Command::Rect((1, 2), (3, 4))),
            ("paint 7 8", Command::Paint(7, 8)),
            ("erase 9 10", Command::Erase(9, 10)),
            ("APPLY", Command::Apply),
            ("undo", Command::Undo),
            ("redo", Command::Redo),
            ("save out dir/clean.png", Command::Save(PathBuf::from("out dir/clean.png"))),
        ];
        for (text, expected) in cases {
            assert_eq!(text.parse::<Command>().unwrap(), expected, "{text}");
        }
    }

    #[test]
    fn rejects_malformed_commands() {
        for text in [
            "zap",
            "brush",
            "brush big",
            "press 1",
            "rect 1 2 3",
            "undo 2",
            "tool lasso",
            "method magic",
            "zoom sideways",
            "save",
        ] {
            assert!(text.parse::<Command>().is_err(), "{text} should fail");
        }
    }

    #[test]
    fn parse_skips_comments_and_reports_line_numbers() {
        let script = Script::parse("# header\n\nbrush 4 # inline\nundo\n").unwrap();
        assert_eq!(script.len(), 2);

        let err = Script::parse("undo\n\nfrobnicate\n").unwrap_err();
        match err {
            Error::Script { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("frobnicate"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn hash_inside_a_word_is_not_a_comment() {
        assert_eq!(strip_comment("save take#2.png"), "save take#2.png");
        assert_eq!(strip_comment("save out.png # final"), "save out.png ");
        assert_eq!(strip_comment("#undo"), "");

        let script = Script::parse("save shots/#3/clean.png\nundo\t# step back\n").unwrap();
        let commands: Vec<_> = script.commands().collect();
        assert_eq!(
            commands,
            [
                &Command::Save(PathBuf::from("shots/#3/clean.png")),
                &Command::Undo
            ]
        );
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!("ZOOM IN".parse::<Command>().unwrap(), Command::Zoom(Zoom::In));
        assert_eq!("zoom Reset".parse::<Command>().unwrap(), Command::Zoom(Zoom::Reset));
        assert_eq!("Tool Brush".parse::<Command>().unwrap(), Command::Tool(Tool::Brush));
    }

    #[test]
    fn run_drives_session() {
        let mut img = RgbImage::from_pixel(30, 20, Rgb([70, 70, 70]));
        img.put_pixel(10, 10, Rgb([255, 255, 255]));
        let mut session = Session::new(img);

        let script = Script::parse(
            "tool rect\n\
             zoom 2\n\
             press 16 16\n\
             release 26 26\n\
             undo\n\
             redo\n",
        )
        .unwrap();
        script.run(&mut session).unwrap();

        assert_eq!(*session.image().get_pixel(10, 10), Rgb([70, 70, 70]));
        assert_eq!(session.mask().unwrap().marked_count(), 25);
    }

    #[test]
    fn run_reports_failing_line() {
        let mut session = Session::new(RgbImage::new(5, 5));
        let script = Script::parse("rect 0 0 5 5\napply\n").unwrap();
        let err = script.run(&mut session).unwrap_err();
        assert!(matches!(err, Error::Script { line: 2, .. }));
    }
}
