use wasmtime::ResourceLimiter;

/// Caps guest linear memory (and, proportionally, its tables).
pub struct MemoryLimiter {
    max_memory_hard: usize,
    max_table_elements_hard: usize,
}

impl MemoryLimiter {
    pub fn new(max_memory_hard: usize) -> Self {
        // Function tables are host-allocated too; bound them by the same budget.
        const TABLE_ELEMENT_BUDGET_BYTES: usize = 64;
        const MIN_TABLE_ELEMENTS: usize = 1024;
        let max_table_elements_hard = core::cmp::max(
            max_memory_hard / TABLE_ELEMENT_BUDGET_BYTES,
            MIN_TABLE_ELEMENTS,
        );

        Self {
            max_memory_hard,
            max_table_elements_hard,
        }
    }
}

impl ResourceLimiter for MemoryLimiter {
    fn memory_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> wasmtime::Result<bool> {
        Ok(desired <= self.max_memory_hard)
    }

    fn table_growing(
        &mut self,
        _current: usize,
        desired: usize,
        _maximum: Option<usize>,
    ) -> wasmtime::Result<bool> {
        Ok(desired <= self.max_table_elements_hard)
    }
}
