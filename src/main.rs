fn main() -> anyhow::Result<()> {
    physioplus_lib::run()
}
