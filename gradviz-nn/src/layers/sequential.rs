use crate::error::NnError;
use crate::forward::Forward;
use crate::module::Module;
use crate::tensor::Tensor;

/// A container that runs its children in insertion order, feeding each
/// child's outputs to the next.
#[derive(Debug, Default)]
pub struct Sequential {
    children: Vec<(String, Box<dyn Module>)>,
}

impl Sequential {
    pub fn new() -> Self {
        Sequential {
            children: Vec::new(),
        }
    }

    pub fn add_module(&mut self, name: &str, module: Box<dyn Module>) {
        self.children.push((name.to_string(), module));
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Module for Sequential {
    fn forward(&self, cx: &mut Forward<'_>, inputs: &[Tensor]) -> Result<Vec<Tensor>, NnError> {
        let mut current = inputs.to_vec();
        for (_, child) in &self.children {
            current = cx.call(child.as_ref(), &current)?;
        }
        Ok(current)
    }

    fn named_children(&self) -> Vec<(String, &dyn Module)> {
        self.children
            .iter()
            .map(|(name, child)| (name.clone(), child.as_ref()))
            .collect()
    }

    fn type_name(&self) -> &'static str {
        "Sequential"
    }
}
