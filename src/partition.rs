use std::ops::Index;

use roaring::RoaringBitmap;

use crate::types::Vertex;

/// A community: a set of vertices with unique membership.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    members: RoaringBitmap,
}

impl Block {
    pub fn new() -> Self {
        Block::default()
    }

    pub fn singleton(vertex: Vertex) -> Self {
        let mut block = Block::new();
        block.insert(vertex);
        block
    }

    /// Returns false when the vertex was already a member.
    pub fn insert(&mut self, vertex: Vertex) -> bool {
        self.members.insert(vertex.index())
    }

    #[inline]
    pub fn contains(&self, vertex: Vertex) -> bool {
        self.members.contains(vertex.index())
    }

    pub fn len(&self) -> usize {
        self.members.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.members.iter().map(Vertex::new)
    }

    /// Number of vertices present in both blocks.
    pub fn overlap(&self, other: &Block) -> usize {
        self.members.intersection_len(&other.members) as usize
    }
}

impl FromIterator<Vertex> for Block {
    fn from_iter<T: IntoIterator<Item = Vertex>>(iter: T) -> Self {
        Block {
            members: iter.into_iter().map(|v| v.index()).collect(),
        }
    }
}

impl Extend<Vertex> for Block {
    fn extend<T: IntoIterator<Item = Vertex>>(&mut self, iter: T) {
        self.members.extend(iter.into_iter().map(|v| v.index()));
    }
}

/// Ordered collection of blocks. The i-th block becomes meta-vertex i when joined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    blocks: Vec<Block>,
}

impl Partition {
    pub fn new() -> Self {
        Partition::default()
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn get(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }
}

impl Index<usize> for Partition {
    type Output = Block;

    fn index(&self, index: usize) -> &Block {
        &self.blocks[index]
    }
}

impl FromIterator<Block> for Partition {
    fn from_iter<T: IntoIterator<Item = Block>>(iter: T) -> Self {
        Partition {
            blocks: iter.into_iter().collect(),
        }
    }
}

impl Extend<Block> for Partition {
    fn extend<T: IntoIterator<Item = Block>>(&mut self, iter: T) {
        self.blocks.extend(iter);
    }
}

impl IntoIterator for Partition {
    type Item = Block;
    type IntoIter = std::vec::IntoIter<Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}

impl<'a> IntoIterator for &'a Partition {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}
