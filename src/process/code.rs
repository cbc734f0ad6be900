//! Control word encoding shared with the tracked processes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Value of a process's control word.
///
/// The integer encoding is part of the shared-memory layout and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i32)]
pub enum Control {
    Running = 0,
    Paused = 1,
    Step = 2,
    Exit = 3,
    NoCompute = 5,
}

impl Control {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for Control {
    type Error = i32;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Control::Running),
            1 => Ok(Control::Paused),
            2 => Ok(Control::Step),
            3 => Ok(Control::Exit),
            5 => Ok(Control::NoCompute),
            other => Err(other),
        }
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Control::Running => "RUNNING",
            Control::Paused => "PAUSED",
            Control::Step => "STEP",
            Control::Exit => "EXIT",
            Control::NoCompute => "NO_COMPUTE",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_encoding() {
        assert_eq!(Control::Running.code(), 0);
        assert_eq!(Control::Paused.code(), 1);
        assert_eq!(Control::Step.code(), 2);
        assert_eq!(Control::Exit.code(), 3);
        assert_eq!(Control::NoCompute.code(), 5);
        assert_eq!(Control::try_from(5), Ok(Control::NoCompute));
        assert_eq!(Control::try_from(4), Err(4));
    }
}
