/// Defines a `u32` backed handle into an index arena.
///
/// The generated type is `Copy`, ordered and hashable. It can only be created
/// from a `usize` index via `from_usize`, which panics if the arena ever grows
/// past `u32::MAX` entries.
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name {
            id: u32,
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.id)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.id)
            }
        }

        impl $name {
            #[inline]
            pub fn from_usize(index: usize) -> Self {
                let id = u32::try_from(index).expect(concat!(
                    stringify!($name),
                    " arena exceeded u32::MAX entries"
                ));
                Self { id }
            }

            #[inline]
            pub fn as_usize(&self) -> usize {
                self.id as usize
            }

            #[inline]
            pub fn id(&self) -> u32 {
                self.id
            }
        }
    };
}
