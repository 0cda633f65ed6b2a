use crate::error::{ErrorKind, ValueError};
use crate::token::DataType;
use crate::value::{Shape, Value};
use std::collections::BTreeMap;

/// Static facts recorded when a name is declared.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub dtype: DataType,
    pub shape: Shape,
    pub rank: usize,
    pub dimensions: Vec<usize>,
}

/// The program's single flat namespace: the declared-identifier registry and
/// the current value bound to each declared name.
#[derive(Debug, Default)]
pub struct Environment {
    declarations: BTreeMap<String, Declaration>,
    values: BTreeMap<String, Value>,
}

impl Environment {
    pub fn new() -> Environment {
        Environment::default()
    }

    /// Registers `name` and binds it to the zero value of its type.
    ///
    /// Declaring a name again with the same type and shape resets its value,
    /// which is what happens when a loop body containing a declaration runs
    /// more than once. Any other redeclaration is an error.
    pub fn declare(
        &mut self,
        name: &str,
        dtype: DataType,
        shape: Shape,
        dimensions: Vec<usize>,
    ) -> Result<(), ValueError> {
        if let Some(existing) = self.declarations.get(name) {
            if existing.dtype != dtype || existing.shape != shape {
                return Err(ValueError::new(
                    ErrorKind::NameError,
                    format!(
                        "'{}' is already declared as {} {}",
                        name, existing.dtype, existing.shape
                    ),
                ));
            }
        }
        let rank = if shape == Shape::Scalar { 0 } else { 1 };
        self.declarations.insert(
            name.to_string(),
            Declaration {
                name: name.to_string(),
                dtype,
                shape,
                rank,
                dimensions,
            },
        );
        self.values
            .insert(name.to_string(), Value::zero(dtype, shape));
        Ok(())
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.get(name)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.declarations.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn put(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }
}
