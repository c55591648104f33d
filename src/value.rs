//! # Evaluator values
//!
//! The evaluation stack (spec §3, "Evaluation stack of depth STACKSIZE")
//! holds `Value`s rather than raw numeric cells, since string-valued
//! expressions share the same stack as numeric ones (spec §4.E, string
//! comparison).

use crate::config::Number;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(Number),
    Str(String),
}

impl Value {
    pub fn as_num(&self) -> crate::error::Result<Number> {
        match self {
            Value::Num(n) => Ok(*n),
            // "a lone string in numeric context evaluates to 0 when empty
            // or the first character's code otherwise" (spec §4.E).
            Value::Str(s) => Ok(s.chars().next().map(|c| c as i32 as Number).unwrap_or(0 as Number)),
        }
    }

    pub fn as_str(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            Value::Num(n) => format_number(*n),
        }
    }

    pub fn is_truthy(&self) -> crate::error::Result<bool> {
        Ok(self.as_num()? != 0 as Number)
    }
}

pub fn format_number(n: Number) -> String {
    #[cfg(not(feature = "float"))]
    {
        n.to_string()
    }
    #[cfg(feature = "float")]
    {
        if n.fract() == 0.0 {
            format!("{}", n as i64)
        } else {
            format!("{}", n)
        }
    }
}
