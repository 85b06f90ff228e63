/*
[INPUT]:  Parsed subcommand arguments
[OUTPUT]: Command side effects and printed results
[POS]:    CLI layer - subcommand handlers
[UPDATE]: When adding subcommands
*/

pub mod init;
