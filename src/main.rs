fn main() {
    zen_cli::zen_cli_entry();
}
