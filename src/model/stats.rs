/// Counters for the end-of-run report.
#[derive(Debug, Default)]
pub struct Stats {
    n_records: usize,
    n_malformed_records: usize,
    n_event_groups: usize,
    n_transactions: usize,
}

impl Stats {
    pub fn inc_records(&mut self) {
        self.n_records += 1;
    }

    pub fn inc_malformed_records(&mut self) {
        self.n_malformed_records += 1;
    }

    pub fn add_event_groups(&mut self, n: usize) {
        self.n_event_groups += n;
    }

    pub fn add_transactions(&mut self, n: usize) {
        self.n_transactions += n;
    }

    pub fn records(&self) -> usize {
        self.n_records
    }

    pub fn malformed_records(&self) -> usize {
        self.n_malformed_records
    }

    pub fn pretty_print(&self) {
        println!("{self:#?}");
        println!();
    }
}
