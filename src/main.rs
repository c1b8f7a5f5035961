fn main() {
    clinicare::run()
}
