use rand::Rng;
use std::fmt::Debug;

pub trait Action: Debug + Copy + Clone + Into<i64> + TryFrom<i64> {
    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let actions = Self::enumerate();
        actions[rng.gen_range(0..actions.len())]
    }

    fn enumerate() -> Vec<Self>;

    fn size() -> usize {
        Self::enumerate().len()
    }
}
