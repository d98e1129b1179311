use std::collections::BTreeSet;

pub trait GetYear {
    fn get_year(&self) -> i32;
}

pub trait CheckYearsExt {
    fn years(&self) -> BTreeSet<i32>;
    fn check_year(&self, year: i32) -> Result<(), BTreeSet<i32>>;
}

/// Blanket implementation for every slice whose items implement `GetYear`.
impl<T> CheckYearsExt for [T]
where
    T: GetYear,
{
    fn years(&self) -> BTreeSet<i32> {
        self.iter().map(|item| item.get_year()).collect()
    }

    /// Succeeds when at least one item falls in `year`. Otherwise returns the years that were seen.
    fn check_year(&self, year: i32) -> Result<(), BTreeSet<i32>> {
        let years = self.years();

        if years.contains(&year) {
            Ok(())
        } else {
            Err(years)
        }
    }
}
