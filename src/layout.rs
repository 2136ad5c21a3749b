#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleLayout {
    pub index: usize,
    pub base: usize,
    pub size: usize,
}

impl ModuleLayout {
    pub fn end(&self) -> usize {
        self.base + self.size
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutCursor {
    placed: Vec<ModuleLayout>,
}

impl LayoutCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn used(&self) -> usize {
        self.placed.last().map_or(0, ModuleLayout::end)
    }

    pub fn place(&mut self, size: usize) -> ModuleLayout {
        let layout = ModuleLayout {
            index: self.placed.len() + 1,
            base: self.used(),
            size,
        };
        self.placed.push(layout);
        layout
    }

    pub fn finish(self) -> Vec<ModuleLayout> {
        self.placed
    }
}
