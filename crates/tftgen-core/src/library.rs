use std::collections::HashMap;
use std::sync::Arc;

use crate::cell::Cell;
use crate::error::{LayoutError, Result};
use crate::layer::LayerStack;

/// A set of uniquely named cells, ready to be written out as one GDS library.
#[derive(Debug, Clone)]
pub struct Library {
    pub name: String,
    /// Technology layers.
    pub layer_stack: LayerStack,
    /// Cells in dependency order: every cell follows the cells it references.
    cells: Vec<Arc<Cell>>,
    by_name: HashMap<String, usize>,
    top: Option<usize>,
}

impl Library {
    pub fn new(name: &str, layer_stack: LayerStack) -> Self {
        Self {
            name: name.to_string(),
            layer_stack,
            cells: Vec::new(),
            by_name: HashMap::new(),
            top: None,
        }
    }

    /// Library holding `top` and its whole hierarchy.
    pub fn from_top(name: &str, layer_stack: LayerStack, top: Arc<Cell>) -> Result<Self> {
        let mut lib = Self::new(name, layer_stack);
        lib.add_cell(top.clone())?;
        lib.top = lib.by_name.get(&top.name).copied();
        Ok(lib)
    }

    /// Add `cell` and every cell below it. A cell already present under the
    /// same name is shared if its content matches. The first cell added
    /// becomes the top cell.
    pub fn add_cell(&mut self, cell: Arc<Cell>) -> Result<()> {
        let mut stack = Vec::new();
        self.visit(&cell, &mut stack)?;
        if self.top.is_none() {
            self.top = self.by_name.get(&cell.name).copied();
        }
        Ok(())
    }

    fn visit(&mut self, cell: &Arc<Cell>, stack: &mut Vec<String>) -> Result<()> {
        if stack.contains(&cell.name) {
            return Err(LayoutError::RecursiveCell(cell.name.clone()));
        }
        if let Some(&i) = self.by_name.get(&cell.name) {
            let existing = &self.cells[i];
            if Arc::ptr_eq(existing, cell) || **existing == **cell {
                return Ok(());
            }
            return Err(LayoutError::DuplicateCellName(cell.name.clone()));
        }

        stack.push(cell.name.clone());
        for inst in &cell.instances {
            self.visit(&inst.cell, stack)?;
        }
        stack.pop();

        self.by_name.insert(cell.name.clone(), self.cells.len());
        self.cells.push(cell.clone());
        Ok(())
    }

    pub fn set_top(&mut self, name: &str) -> bool {
        match self.by_name.get(name) {
            Some(&i) => {
                self.top = Some(i);
                true
            }
            None => false,
        }
    }

    pub fn top(&self) -> Option<&Arc<Cell>> {
        self.top.map(|i| &self.cells[i])
    }

    pub fn get_cell(&self, name: &str) -> Option<&Arc<Cell>> {
        self.by_name.get(name).map(|&i| &self.cells[i])
    }

    pub fn cell_names(&self) -> Vec<&str> {
        self.cells.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Cells in dependency order.
    pub fn all_cells(&self) -> impl Iterator<Item = &Arc<Cell>> {
        self.cells.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellInstance;
    use crate::geometry::Rect;
    use crate::LayerId;

    const W: LayerId = LayerId::new(2, 0);

    fn leaf(name: &str, w: f64) -> Arc<Cell> {
        let mut cell = Cell::new(name);
        cell.add_rect(Rect::new(W, 0.0, 0.0, w, 1.0));
        Arc::new(cell)
    }

    fn parent(name: &str, children: &[Arc<Cell>]) -> Arc<Cell> {
        let mut cell = Cell::new(name);
        for c in children {
            cell.add_instance(CellInstance::new(c.clone()));
        }
        Arc::new(cell)
    }

    #[test]
    fn test_library_create() {
        let lib = Library::new("test_project", LayerStack::new());
        assert_eq!(lib.name, "test_project");
        assert_eq!(lib.cell_count(), 0);
        assert!(lib.top().is_none());
    }

    #[test]
    fn test_children_come_first() {
        let a = leaf("a", 1.0);
        let mid = parent("mid", &[a.clone()]);
        let top = parent("top", &[mid, a]);
        let lib = Library::from_top("lib", LayerStack::new(), top).unwrap();
        assert_eq!(lib.cell_names(), vec!["a", "mid", "top"]);
        assert_eq!(lib.top().unwrap().name, "top");
        assert!(lib.get_cell("mid").is_some());
    }

    #[test]
    fn test_equal_content_is_shared() {
        // Two separately built but identical cells collapse into one entry.
        let top = parent("top", &[leaf("a", 1.0), leaf("a", 1.0)]);
        let lib = Library::from_top("lib", LayerStack::new(), top).unwrap();
        assert_eq!(lib.cell_count(), 2);
    }

    #[test]
    fn test_name_clash_rejected() {
        let top = parent("top", &[leaf("a", 1.0), leaf("a", 2.0)]);
        assert_eq!(
            Library::from_top("lib", LayerStack::new(), top).unwrap_err(),
            LayoutError::DuplicateCellName("a".to_string())
        );
    }

    #[test]
    fn test_self_named_child_is_recursive() {
        let inner = leaf("loop", 1.0);
        let top = parent("loop", &[inner]);
        assert!(matches!(
            Library::from_top("lib", LayerStack::new(), top),
            Err(LayoutError::RecursiveCell(_))
        ));
    }
}
