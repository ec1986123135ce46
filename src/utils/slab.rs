/// Stable handle into a [`Slab`]. Stale keys never alias a newer entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct Key {
    index: usize,
    generation: u64,
}

pub(crate) struct Slab<T> {
    slots: Vec<(u64, Option<T>)>,
    free: Vec<usize>,
    len: usize,
}

impl<T> Slab<T> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub(crate) fn insert(&mut self, item: T) -> Key {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.1 = Some(item);
            return Key {
                index,
                generation: slot.0,
            };
        }

        self.slots.push((0, Some(item)));
        Key {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    pub(crate) fn get(&self, key: Key) -> Option<&T> {
        self.slots
            .get(key.index)
            .filter(|(generation, _)| *generation == key.generation)
            .and_then(|(_, item)| item.as_ref())
    }

    pub(crate) fn remove(&mut self, key: Key) -> Option<T> {
        let slot = self.slots.get_mut(key.index)?;
        if slot.0 != key.generation {
            return None;
        }

        let item = slot.1.take()?;
        slot.0 += 1;
        self.free.push(key.index);
        self.len -= 1;

        Some(item)
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}
