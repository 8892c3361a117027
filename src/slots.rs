use bitvec::prelude::*;

/// A fixed-capacity array of slots with a bitmap of the occupied ones.
pub struct Slots<T> {
    bits: BitBox<u64>,
    entries: Box<[Option<T>]>,
    count: usize,
}

impl<T> Slots<T> {
    /// Constructs `capacity` empty slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            bits: bitbox![u64, Lsb0; 0; capacity],
            entries: (0..capacity).map(|_| None).collect(),
            count: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of occupied slots.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the lowest empty slot.
    pub fn first_free(&self) -> Option<usize> {
        self.bits.first_zero()
    }

    /// Stores `entry` in the lowest empty slot, returning its index.
    /// Hands `entry` back when every slot is occupied.
    pub fn insert(&mut self, entry: T) -> Result<usize, T> {
        match self.first_free() {
            Some(index) => {
                self.fill(index, entry);
                Ok(index)
            }
            None => Err(entry),
        }
    }

    /// Stores `entry` at `index` if that slot exists and is empty.
    pub fn insert_at(&mut self, index: usize, entry: T) -> Result<(), T> {
        match self.bits.get(index).map(|bit| *bit) {
            Some(false) => {
                self.fill(index, entry);
                Ok(())
            }
            _ => Err(entry),
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if !self.is_sane() {
            return None;
        }
        self.entries.get(index)?.as_ref()
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if !self.is_sane() {
            return None;
        }
        self.entries.get_mut(index)?.as_mut()
    }

    /// Empties the slot at `index`, returning what it held.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let entry = self.entries.get_mut(index)?.take()?;
        self.bits.set(index, false);
        self.count -= 1;
        Some(entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.bits
            .iter_ones()
            .filter_map(|i| self.entries[i].as_ref().map(|entry| (i, entry)))
    }

    fn fill(&mut self, index: usize, entry: T) {
        self.entries[index] = Some(entry);
        self.bits.set(index, true);
        self.count += 1;
        debug_assert_eq!(self.count, self.bits.count_ones());
    }

    /// Lookups are refused while nothing is stored or the count is corrupt.
    fn is_sane(&self) -> bool {
        self.count != 0 && self.count <= self.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_lowest_first() {
        let mut slots = Slots::new(4);
        assert_eq!(slots.insert('a'), Ok(0));
        assert_eq!(slots.insert('b'), Ok(1));
        assert_eq!(slots.count(), 2);
        assert_eq!(slots.get(1), Some(&'b'));
    }

    #[test]
    fn insert_full() {
        let mut slots = Slots::new(2);
        slots.insert(1).unwrap();
        slots.insert(2).unwrap();
        assert_eq!(slots.insert(3), Err(3));
        assert_eq!(slots.count(), 2);
    }

    #[test]
    fn remove_frees_slot() {
        let mut slots = Slots::new(3);
        slots.insert('a').unwrap();
        slots.insert('b').unwrap();
        slots.insert('c').unwrap();

        assert_eq!(slots.remove(1), Some('b'));
        assert_eq!(slots.count(), 2);
        assert_eq!(slots.get(1), None);
        assert_eq!(slots.insert('d'), Ok(1));
    }

    #[test]
    fn remove_empty() {
        let mut slots: Slots<u8> = Slots::new(2);
        assert_eq!(slots.remove(0), None);
        assert_eq!(slots.remove(7), None);
        assert_eq!(slots.count(), 0);
    }

    #[test]
    fn insert_at() {
        let mut slots = Slots::new(3);
        assert_eq!(slots.insert_at(2, 'x'), Ok(()));
        assert_eq!(slots.insert_at(2, 'y'), Err('y'));
        assert_eq!(slots.insert_at(3, 'z'), Err('z'));
        assert_eq!(slots.first_free(), Some(0));
        assert_eq!(slots.iter().collect::<Vec<_>>(), vec![(2, &'x')]);
    }

    #[test]
    fn out_of_range() {
        let mut slots = Slots::new(1);
        slots.insert(0u8).unwrap();
        assert_eq!(slots.get(1), None);
        assert_eq!(slots.get_mut(usize::MAX), None);
    }

    #[test]
    fn zero_capacity() {
        let mut slots = Slots::new(0);
        assert_eq!(slots.first_free(), None);
        assert_eq!(slots.insert(()), Err(()));
    }
}
