//! Virtual variable stacks.
//!
//! A rule subroutine keeps its intermediate results in numbered locals
//! (`r0`, `r1`, ...) and its saved input positions in another set
//! (`l0`, `l1`, ...). Lowering treats each set as a stack: pushing assigns the
//! next free local, popping releases it for reuse by a later branch. The
//! high-water mark decides how many locals the subroutine declares.

/// One stack of locals sharing a name prefix and a declared type.
#[derive(Debug, Clone)]
pub struct VarStack {
    prefix: &'static str,
    ty: String,
    /// Index of the topmost occupied local, `-1` when empty.
    sp: isize,
    /// Highest index ever occupied.
    max_sp: isize,
}

impl VarStack {
    pub fn new(prefix: &'static str, ty: impl Into<String>) -> Self {
        VarStack {
            prefix,
            ty: ty.into(),
            sp: -1,
            max_sp: -1,
        }
    }

    fn name(&self, index: isize) -> String {
        if index < 0 {
            panic!(
                "var stack '{}' underflow: attempt to use var at index {}",
                self.prefix, index
            );
        }
        format!("{}{}", self.prefix, index)
    }

    /// Index of the topmost occupied local, `-1` when empty.
    pub fn sp(&self) -> isize {
        self.sp
    }

    /// Store `expr` in the next free local. Returns the assignment statement.
    pub fn push(&mut self, expr: impl AsRef<str>) -> String {
        self.sp += 1;
        self.max_sp = self.max_sp.max(self.sp);
        format!("{} = {};", self.name(self.sp), expr.as_ref())
    }

    /// Occupy the next local again without emitting code, undoing a `pop`
    /// whose value is still live on other control-flow paths.
    pub fn reclaim(&mut self) {
        self.sp += 1;
        self.max_sp = self.max_sp.max(self.sp);
    }

    /// Release the top local and return its name.
    pub fn pop(&mut self) -> String {
        let name = self.name(self.sp);
        self.sp -= 1;
        name
    }

    /// Release the top `n` locals, returned bottom first.
    pub fn pop_n(&mut self, n: usize) -> Vec<String> {
        let end = self.sp + 1;
        self.sp -= n as isize;
        (self.sp + 1..end).map(|i| self.name(i)).collect()
    }

    /// Overwrite the top local with `expr`. Returns the assignment statement.
    pub fn replace(&mut self, expr: impl AsRef<str>) -> String {
        self.pop();
        self.push(expr)
    }

    /// Name of the top local.
    pub fn top(&self) -> String {
        self.name(self.sp)
    }

    /// Name of the local `i` positions below the top.
    pub fn index(&self, i: usize) -> String {
        self.name(self.sp - i as isize)
    }

    /// Name of the local with absolute index `i`.
    pub fn local(&self, i: usize) -> String {
        self.name(i as isize)
    }

    /// Name of the local holding a rule's result.
    pub fn result(&self) -> String {
        self.name(0)
    }

    /// Declaration of every local ever used, e.g. `Object r0, r1;`, or
    /// `None` if the stack was never pushed.
    pub fn defines(&self) -> Option<String> {
        if self.max_sp < 0 {
            return None;
        }
        let names: Vec<String> = (0..=self.max_sp).map(|i| self.name(i)).collect();
        Some(format!("{} {};", self.ty, names.join(", ")))
    }
}
