use crate::descriptor::{Describe, TypeDescriptor};

macro_rules! describe_values {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Describe for $ty {
                fn describe() -> TypeDescriptor {
                    TypeDescriptor::value::<$ty>()
                        .construct_with(<$ty>::default)
                        .build()
                }
            }
        )*
    };
}

describe_values!(bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

impl Describe for String {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::concrete::<String>()
            .construct_with(String::new)
            .build()
    }
}
