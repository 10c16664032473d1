// Copyright 2018 Andre-Philippe Paquet
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

/// Binary min-heap of block indices driving the k-way merge.
///
/// The heap doesn't own the blocks nor know how they compare: every mutating call takes an `is_less`
/// predicate over two indices, which the merge answers by comparing the blocks' read-ahead records.
/// The root is always the block holding the smallest unconsumed record. Equal records are not ordered
/// any further.
#[derive(Debug, Default)]
pub(crate) struct MergeHeap {
    nodes: Vec<usize>,
}

impl MergeHeap {
    pub(crate) fn with_capacity(capacity: usize) -> MergeHeap {
        MergeHeap {
            nodes: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn push<F>(&mut self, index: usize, mut is_less: F)
    where
        F: FnMut(usize, usize) -> bool,
    {
        self.nodes.push(index);
        let mut child = self.nodes.len() - 1;
        while child > 0 {
            let parent = (child - 1) / 2;
            if !is_less(self.nodes[child], self.nodes[parent]) {
                break;
            }
            self.nodes.swap(child, parent);
            child = parent;
        }
    }

    /// Removes the root. The removed block is not compared again, so its record may already be stale.
    pub(crate) fn pop<F>(&mut self, mut is_less: F) -> Option<usize>
    where
        F: FnMut(usize, usize) -> bool,
    {
        if self.nodes.is_empty() {
            return None;
        }

        let root = self.nodes.swap_remove(0);
        let len = self.nodes.len();
        let mut parent = 0;
        loop {
            let left = 2 * parent + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let smallest = if right < len && is_less(self.nodes[right], self.nodes[left]) {
                right
            } else {
                left
            };
            if !is_less(self.nodes[smallest], self.nodes[parent]) {
                break;
            }
            self.nodes.swap(parent, smallest);
            parent = smallest;
        }

        Some(root)
    }
}
