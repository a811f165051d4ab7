use atat::atat_derive::AtatEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, AtatEnum)]
pub enum Echo {
    Disable = 0,
    Enable = 1,
}
