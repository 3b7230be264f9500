use std::collections::HashMap;

/// Stack of name-to-value frames. Frame 0 is the permanent global frame;
/// every active function call contributes one frame above it.
pub struct ScopeStack {
    frames: Vec<HashMap<String, f64>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    /// Writes into the innermost frame, creating the binding if absent.
    /// Names bound only in outer frames are shadowed, never mutated.
    pub fn set(&mut self, name: &str, value: f64) {
        let frame = self.frames.last_mut().expect("scope stack is never empty");
        if let Some(slot) = frame.get_mut(name) {
            *slot = value;
        } else {
            frame.insert(name.to_string(), value);
        }
    }

    /// Searches frames innermost to outermost.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
    }

    pub fn enter_scope(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn leave_scope(&mut self) {
        assert!(self.frames.len() > 1, "cannot leave the global scope");
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_writes_the_innermost_frame() {
        let mut scopes = ScopeStack::new();
        scopes.set("a", 10.0);
        scopes.enter_scope();
        scopes.set("a", 5.0);
        assert_eq!(scopes.get("a"), Some(5.0));
        scopes.leave_scope();
        assert_eq!(scopes.get("a"), Some(10.0));
    }

    #[test]
    fn get_falls_through_to_outer_frames() {
        let mut scopes = ScopeStack::new();
        scopes.set("a", 1.0);
        scopes.enter_scope();
        assert_eq!(scopes.get("a"), Some(1.0));
        assert_eq!(scopes.get("b"), None);
    }

    #[test]
    #[should_panic(expected = "cannot leave the global scope")]
    fn global_frame_cannot_be_popped() {
        let mut scopes = ScopeStack::new();
        scopes.leave_scope();
    }
}
