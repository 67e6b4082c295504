// Copyright 2025 foyer Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// A guard that runs a rollback action on drop unless it is committed.
///
/// Used to pair a reversible first step with a fallible second step: if the second step bails out early (with `?`
/// or a panic), the first step is undone when the guard goes out of scope.
#[must_use = "the rollback runs immediately if the guard is not bound"]
pub struct Rollback<T, F>
where
    F: FnOnce(&mut T),
{
    target: T,
    action: Option<F>,
}

impl<T, F> Rollback<T, F>
where
    F: FnOnce(&mut T),
{
    /// Arm a rollback `action` over `target`.
    pub fn new(target: T, action: F) -> Self {
        Self {
            target,
            action: Some(action),
        }
    }

    /// Disarm the guard. The target is released without running the rollback action.
    pub fn commit(mut self) {
        self.action = None;
    }
}

impl<T, F> Drop for Rollback<T, F>
where
    F: FnOnce(&mut T),
{
    fn drop(&mut self) {
        if let Some(action) = self.action.take() {
            action(&mut self.target);
        }
    }
}
