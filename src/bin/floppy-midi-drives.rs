use floppy_midi_player::drive::mounted_disks;

fn main() {
    println!("size_kib;removable;floppy;mount_point");
    for disk in mounted_disks() {
        println!(
            "{};{};{};{}",
            disk.total_space / 1024,
            disk.removable,
            disk.is_floppy(),
            disk.mount_point.display()
        );
    }
}
